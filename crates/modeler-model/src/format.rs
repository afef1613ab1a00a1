//! The textual model format.
//!
//! A model file is pretty printed JSON in which every structured value is
//! wrapped as `{"class": <tag>, "values": {...}}`. Primitive values and
//! lists are written as plain JSON. The reader dispatches on the last dotted
//! token of the tag, so tags written by older versions under a different
//! module path still load.
//!
//! ```json
//! {
//!   "class": "processing.modeler.ModelerAlgorithm.ModelerAlgorithm",
//!   "values": {
//!     "name": "Buffered centroids",
//!     "group": "Examples",
//!     "inputs": { "radius": { "class": "...ModelerParameter", "values": { ... } } },
//!     "algs": { "BUFFER_1": { "class": "...Algorithm", "values": { ... } } },
//!     "helpContent": {}
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use modeler_parameters::ParameterDef;
use serde_json::{Map, Value, json};

use crate::error::ModelError;
use crate::graph::ModelGraph;
use crate::node::{ModelInput, ModelNode, ModelOutput};
use crate::point::Point;
use crate::value::ValueExpression;

const MODELER_MODULE: &str = "processing.modeler.ModelerAlgorithm";
const PARAMETERS_MODULE: &str = "processing.core.parameters";

/// Longest fragment of offending input quoted in a format error.
const FRAGMENT_LEN: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
  Model,
  Node,
  Input,
  Output,
  FromInput,
  FromOutput,
  Compound,
  Point,
}

static TAGS: &[(&str, Tag)] = &[
  ("ModelerAlgorithm", Tag::Model),
  ("Algorithm", Tag::Node),
  ("ModelerParameter", Tag::Input),
  ("ModelerOutput", Tag::Output),
  ("ValueFromInput", Tag::FromInput),
  ("ValueFromOutput", Tag::FromOutput),
  ("CompoundValue", Tag::Compound),
  ("point", Tag::Point),
];

impl Tag {
  fn class(self) -> String {
    match self {
      Self::Point => "point".to_string(),
      other => format!("{}.{}", MODELER_MODULE, other.short_name()),
    }
  }

  fn short_name(self) -> &'static str {
    TAGS
      .iter()
      .find(|(_, tag)| *tag == self)
      .map(|(name, _)| *name)
      .unwrap_or_default()
  }

  fn lookup(short_name: &str) -> Option<Self> {
    TAGS
      .iter()
      .find(|(name, _)| *name == short_name)
      .map(|(_, tag)| *tag)
  }
}

impl ModelGraph {
  /// Serialize the model to its textual form.
  pub fn to_graph_text(&self) -> Result<String, ModelError> {
    Ok(serde_json::to_string_pretty(&encode_model(self)?)?)
  }

  /// Parse a model from its textual form.
  pub fn from_graph_text(text: &str) -> Result<Self, ModelError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ModelError::Format {
      fragment: truncate(text),
      message: e.to_string(),
    })?;
    decode_model(&value)
  }

  /// Load a model file, remembering where it came from.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let mut graph = Self::from_graph_text(&text)?;
    graph.description_file = Some(path.to_path_buf());
    Ok(graph)
  }

  /// Write the model to `path` in its textual form.
  pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
    fs::write(path, self.to_graph_text()?)?;
    Ok(())
  }
}

// -----------------------------------------------------------------------
// Encoding
// -----------------------------------------------------------------------

fn tagged(class: String, values: Value) -> Value {
  json!({ "class": class, "values": values })
}

fn encode_model(graph: &ModelGraph) -> Result<Value, ModelError> {
  let mut inputs = Map::new();
  for input in graph.inputs() {
    inputs.insert(input.name().to_string(), encode_input(input)?);
  }

  let mut algs = Map::new();
  for node in graph.nodes() {
    algs.insert(node.name.clone(), encode_node(node)?);
  }

  Ok(tagged(
    Tag::Model.class(),
    json!({
      "inputs": inputs,
      "group": graph.group,
      "name": graph.name,
      "algs": algs,
      "helpContent": graph.help_content,
    }),
  ))
}

fn encode_input(input: &ModelInput) -> Result<Value, ModelError> {
  Ok(tagged(
    Tag::Input.class(),
    json!({
      "param": encode_parameter(&input.parameter)?,
      "pos": encode_point(input.position),
    }),
  ))
}

fn encode_parameter(parameter: &ParameterDef) -> Result<Value, ModelError> {
  let mut values = serde_json::to_value(parameter)?;
  if let Some(fields) = values.as_object_mut() {
    fields.remove("type");
  }
  Ok(tagged(
    format!("{}.{}", PARAMETERS_MODULE, parameter.kind.class_name()),
    values,
  ))
}

fn encode_node(node: &ModelNode) -> Result<Value, ModelError> {
  let params = node
    .bindings
    .iter()
    .map(|(name, value)| Ok((name.clone(), encode_value(value)?)))
    .collect::<Result<Map<String, Value>, ModelError>>()?;

  let outputs: Map<String, Value> = node
    .outputs
    .iter()
    .map(|(name, output)| {
      let values = json!({
        "description": output.description,
        "pos": encode_point(output.position),
      });
      (name.clone(), tagged(Tag::Output.class(), values))
    })
    .collect();

  Ok(tagged(
    Tag::Node.class(),
    json!({
      "name": node.name,
      "description": node.description,
      "consoleName": node.algorithm_id,
      "params": params,
      "outputs": outputs,
      "pos": encode_point(node.position),
      "dependencies": node.dependencies,
      "paramsFolded": node.params_folded,
      "outputsFolded": node.outputs_folded,
      "active": node.active,
    }),
  ))
}

/// Literals are written as plain JSON, so a literal that would read back as
/// something else is refused: arrays are stored as
/// [`ValueExpression::List`] (see [`ValueExpression::literal`]) and objects
/// carrying a `class` key would be taken for a tagged value.
fn encode_value(value: &ValueExpression) -> Result<Value, ModelError> {
  match value {
    ValueExpression::Literal(v @ Value::Array(_)) => Err(format_error(
      v,
      "array literals must be stored as a list of values",
    )),
    ValueExpression::Literal(v @ Value::Object(object)) if object.contains_key("class") => Err(
      format_error(v, "object literals cannot carry a 'class' key"),
    ),
    ValueExpression::Literal(v) => Ok(v.clone()),
    ValueExpression::FromInput { name } => Ok(tagged(
      Tag::FromInput.class(),
      json!({ "name": name }),
    )),
    ValueExpression::FromOutput { node, output } => Ok(tagged(
      Tag::FromOutput.class(),
      json!({ "alg": node, "output": output }),
    )),
    ValueExpression::List(values) => Ok(Value::Array(
      values.iter().map(encode_value).collect::<Result<_, _>>()?,
    )),
    ValueExpression::Compound { values, definition } => Ok(tagged(
      Tag::Compound.class(),
      json!({
        "values": values.iter().map(encode_value).collect::<Result<Vec<_>, _>>()?,
        "definition": definition,
      }),
    )),
  }
}

fn encode_point(point: Option<Point>) -> Value {
  match point {
    Some(p) => tagged(Tag::Point.class(), json!({ "x": p.x, "y": p.y })),
    None => Value::Null,
  }
}

// -----------------------------------------------------------------------
// Decoding
// -----------------------------------------------------------------------

fn truncate(text: &str) -> String {
  let mut fragment: String = text.chars().take(FRAGMENT_LEN).collect();
  if text.chars().count() > FRAGMENT_LEN {
    fragment.push_str("...");
  }
  fragment
}

fn format_error(value: &Value, message: impl Into<String>) -> ModelError {
  ModelError::Format {
    fragment: truncate(&value.to_string()),
    message: message.into(),
  }
}

/// Split a tagged value into the last token of its class and its payload.
fn untag(value: &Value) -> Option<(&str, &Map<String, Value>)> {
  let object = value.as_object()?;
  let class = object.get("class")?.as_str()?;
  let values = object.get("values")?.as_object()?;
  Some((class.rsplit('.').next().unwrap_or(class), values))
}

fn expect_tag(value: &Value, expected: Tag) -> Result<&Map<String, Value>, ModelError> {
  let (class, values) =
    untag(value).ok_or_else(|| format_error(value, "expected a tagged object"))?;
  match Tag::lookup(class) {
    Some(tag) if tag == expected => Ok(values),
    Some(_) => Err(format_error(
      value,
      format!("expected '{}', found '{}'", expected.short_name(), class),
    )),
    None => Err(format_error(value, format!("unknown class '{}'", class))),
  }
}

fn field_str(values: &Map<String, Value>, key: &str) -> Option<String> {
  values.get(key).and_then(Value::as_str).map(str::to_string)
}

fn required_str(
  owner: &Value,
  values: &Map<String, Value>,
  key: &str,
) -> Result<String, ModelError> {
  field_str(values, key).ok_or_else(|| format_error(owner, format!("missing text field '{}'", key)))
}

fn field_bool(values: &Map<String, Value>, key: &str, default: bool) -> bool {
  values.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn field_object<'a>(
  owner: &Value,
  values: &'a Map<String, Value>,
  key: &str,
) -> Result<Option<&'a Map<String, Value>>, ModelError> {
  match values.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::Object(object)) => Ok(Some(object)),
    Some(_) => Err(format_error(owner, format!("field '{}' must be an object", key))),
  }
}

fn decode_model(value: &Value) -> Result<ModelGraph, ModelError> {
  let values = expect_tag(value, Tag::Model)?;

  let mut graph = ModelGraph::new(
    field_str(values, "name").unwrap_or_default(),
    field_str(values, "group").unwrap_or_default(),
  );

  if let Some(help) = field_object(value, values, "helpContent")? {
    graph.help_content = help
      .iter()
      .map(|(key, text)| (key.clone(), modeler_parameters::display_value(text)))
      .collect::<BTreeMap<_, _>>();
  }

  if let Some(inputs) = field_object(value, values, "inputs")? {
    for input in inputs.values() {
      graph.add_parameter(decode_input(input)?)?;
    }
  }

  if let Some(algs) = field_object(value, values, "algs")? {
    for (key, alg) in algs {
      let mut node = decode_node(alg)?;
      if node.name.is_empty() {
        node.name = key.clone();
      }
      graph.add_algorithm(node)?;
    }
  }

  Ok(graph)
}

fn decode_input(value: &Value) -> Result<ModelInput, ModelError> {
  let values = expect_tag(value, Tag::Input)?;
  let param = values
    .get("param")
    .ok_or_else(|| format_error(value, "missing field 'param'"))?;
  Ok(ModelInput {
    parameter: decode_parameter(param)?,
    position: decode_point(values.get("pos"))?,
  })
}

fn decode_parameter(value: &Value) -> Result<ParameterDef, ModelError> {
  let (class, values) =
    untag(value).ok_or_else(|| format_error(value, "expected a tagged parameter"))?;
  if !class.starts_with("Parameter") {
    return Err(format_error(value, format!("unknown parameter class '{}'", class)));
  }

  let mut fields = values.clone();
  fields.insert("type".to_string(), Value::String(class.to_string()));
  serde_json::from_value(Value::Object(fields)).map_err(|e| format_error(value, e.to_string()))
}

fn decode_node(value: &Value) -> Result<ModelNode, ModelError> {
  let values = expect_tag(value, Tag::Node)?;

  let mut node = ModelNode::new(required_str(value, values, "consoleName")?);
  node.name = field_str(values, "name").unwrap_or_default();
  node.description = field_str(values, "description").unwrap_or_default();
  node.position = decode_point(values.get("pos"))?;
  node.active = field_bool(values, "active", true);
  node.params_folded = field_bool(values, "paramsFolded", true);
  node.outputs_folded = field_bool(values, "outputsFolded", true);

  if let Some(params) = field_object(value, values, "params")? {
    for (name, param) in params {
      node.bindings.insert(name.clone(), decode_value(param)?);
    }
  }

  if let Some(outputs) = field_object(value, values, "outputs")? {
    for (name, output) in outputs {
      let fields = expect_tag(output, Tag::Output)?;
      node.outputs.insert(
        name.clone(),
        ModelOutput {
          description: field_str(fields, "description").unwrap_or_default(),
          position: decode_point(fields.get("pos"))?,
        },
      );
    }
  }

  match values.get("dependencies") {
    None | Some(Value::Null) => {}
    Some(Value::Array(deps)) => {
      for dep in deps {
        let name = dep
          .as_str()
          .ok_or_else(|| format_error(dep, "dependency must be a node name"))?;
        node.dependencies.push(name.to_string());
      }
    }
    Some(other) => return Err(format_error(other, "dependencies must be a list")),
  }

  Ok(node)
}

fn decode_value(value: &Value) -> Result<ValueExpression, ModelError> {
  match value {
    Value::Array(items) => Ok(ValueExpression::List(
      items.iter().map(decode_value).collect::<Result<_, _>>()?,
    )),
    Value::Object(object) if object.contains_key("class") => {
      let (class, values) =
        untag(value).ok_or_else(|| format_error(value, "malformed tagged value"))?;
      match Tag::lookup(class) {
        Some(Tag::FromInput) => Ok(ValueExpression::from_input(required_str(
          value, values, "name",
        )?)),
        Some(Tag::FromOutput) => Ok(ValueExpression::from_output(
          required_str(value, values, "alg")?,
          required_str(value, values, "output")?,
        )),
        Some(Tag::Compound) => {
          let items = match values.get("values") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
              .iter()
              .map(decode_value)
              .collect::<Result<_, _>>()?,
            Some(_) => return Err(format_error(value, "compound values must be a list")),
          };
          Ok(ValueExpression::compound(
            items,
            field_str(values, "definition").unwrap_or_default(),
          ))
        }
        _ => Err(format_error(value, format!("unexpected class '{}' in a binding", class))),
      }
    }
    other => Ok(ValueExpression::Literal(other.clone())),
  }
}

fn decode_point(value: Option<&Value>) -> Result<Option<Point>, ModelError> {
  let Some(value) = value.filter(|v| !v.is_null()) else {
    return Ok(None);
  };
  let values = expect_tag(value, Tag::Point)?;
  let coordinate = |key: &str| {
    values
      .get(key)
      .and_then(Value::as_f64)
      .ok_or_else(|| format_error(value, format!("point is missing '{}'", key)))
  };
  Ok(Some(Point::new(coordinate("x")?, coordinate("y")?)))
}
