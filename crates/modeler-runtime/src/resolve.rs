//! Value resolution.
//!
//! Turns the [`ValueExpression`] bound to a parameter into a concrete JSON
//! value, using the normalized model inputs and the outputs of the nodes
//! that already ran. The parameter definition performs the final coercion
//! afterwards, so resolution only has to produce something it can parse.
//!
//! # Compound values
//! The `definition` of a compound value is a minijinja template rendered
//! over three separate namespaces, so names never shadow each other:
//! - `inputs`: every model input referenced by the compound's values
//! - `nodes`: every referenced node, as a map of its outputs
//! - `values`: the resolved values, by position
//! ```text
//! {{ inputs.radius * 2 }}
//! {{ nodes.BUFFER_1.OUTPUT }}-{{ values[1] }}
//! ```

use std::collections::HashMap;

use minijinja::Environment;
use modeler_catalog::ValueMap;
use modeler_model::{ModelGraph, ValueExpression};
use modeler_parameters::display_value;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::error::RuntimeError;

/// Normalize host-supplied values for every model input.
///
/// Missing values fall back to the input's default. Supplied values that do
/// not name a model input are ignored.
pub fn normalize_inputs(graph: &ModelGraph, supplied: &ValueMap) -> Result<ValueMap, RuntimeError> {
  for name in supplied.keys() {
    if graph.input(name).is_none() {
      warn!(input = %name, "ignoring value for unknown model input");
    }
  }

  let mut normalized = ValueMap::new();
  for input in graph.inputs() {
    let raw = supplied.get(input.name()).cloned().unwrap_or(Value::Null);
    let value = input
      .parameter
      .set_value(&raw)
      .map_err(|e| RuntimeError::InvalidInput {
        name: input.name().to_string(),
        message: e.to_string(),
      })?;
    normalized.insert(input.name().to_string(), value);
  }
  Ok(normalized)
}

/// Resolve one bound value.
///
/// # Arguments
/// * `node_id` - The node being prepared (for error messages)
/// * `expression` - The binding to resolve
/// * `inputs` - Normalized model input values
/// * `produced` - Outputs of the nodes that already ran, keyed by node name
pub fn resolve_value(
  node_id: &str,
  expression: &ValueExpression,
  inputs: &ValueMap,
  produced: &HashMap<String, ValueMap>,
) -> Result<Value, RuntimeError> {
  match expression {
    ValueExpression::Literal(value) => Ok(value.clone()),

    ValueExpression::FromInput { name } => {
      inputs
        .get(name)
        .cloned()
        .ok_or_else(|| RuntimeError::InputResolution {
          node_id: node_id.to_string(),
          message: format!("model input '{}' has no value", name),
        })
    }

    ValueExpression::FromOutput { node, output } => produced
      .get(node)
      .and_then(|outputs| outputs.get(output))
      .cloned()
      .ok_or_else(|| RuntimeError::InputResolution {
        node_id: node_id.to_string(),
        message: format!("output '{}' of node '{}' is not available", output, node),
      }),

    ValueExpression::List(values) => {
      let parts = values
        .iter()
        .map(|v| resolve_value(node_id, v, inputs, produced).map(|value| display_value(&value)))
        .collect::<Result<Vec<_>, _>>()?;
      Ok(Value::String(parts.join(";")))
    }

    ValueExpression::Compound { values, definition } => {
      resolve_compound(node_id, values, definition, inputs, produced)
    }
  }
}

fn resolve_compound(
  node_id: &str,
  values: &[ValueExpression],
  definition: &str,
  inputs: &ValueMap,
  produced: &HashMap<String, ValueMap>,
) -> Result<Value, RuntimeError> {
  let mut referenced_inputs = Map::new();
  let mut referenced_nodes = Map::new();
  let mut positional = Vec::with_capacity(values.len());

  for value in values {
    let resolved = resolve_value(node_id, value, inputs, produced)?;
    match value {
      ValueExpression::FromInput { name } => {
        referenced_inputs.insert(name.clone(), resolved.clone());
      }
      ValueExpression::FromOutput { node, output } => {
        let entry = referenced_nodes
          .entry(node.clone())
          .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(outputs) = entry {
          outputs.insert(output.clone(), resolved.clone());
        }
      }
      _ => {}
    }
    positional.push(resolved);
  }
  let context = json!({
    "inputs": referenced_inputs,
    "nodes": referenced_nodes,
    "values": positional,
  });

  let env = Environment::new();
  env
    .render_str(definition, minijinja::Value::from_serialize(&context))
    .map(Value::String)
    .map_err(|e| RuntimeError::InputResolution {
      node_id: node_id.to_string(),
      message: format!("failed to render '{}': {}", definition, e),
    })
}
