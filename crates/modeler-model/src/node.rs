use std::collections::BTreeMap;

use modeler_parameters::ParameterDef;

use crate::point::Point;
use crate::value::ValueExpression;

/// One algorithm invocation inside a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
  /// Unique within the model. Empty until the node is added to a graph,
  /// which then assigns `<ALGORITHM_ID>_<n>`.
  pub name: String,
  /// Catalogue id of the algorithm this node runs.
  pub algorithm_id: String,
  pub description: String,
  /// Parameter name to value expression.
  pub bindings: BTreeMap<String, ValueExpression>,
  /// Outputs promoted to model outputs, keyed by the algorithm output name.
  pub outputs: BTreeMap<String, ModelOutput>,
  pub position: Option<Point>,
  /// Nodes that must run first even without a data dependency.
  pub dependencies: Vec<String>,
  pub active: bool,
  pub params_folded: bool,
  pub outputs_folded: bool,
}

/// A node output exposed as one of the model's own outputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOutput {
  pub description: String,
  pub position: Option<Point>,
}

/// A model-level parameter and where it sits on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
  pub parameter: ParameterDef,
  pub position: Option<Point>,
}

impl ModelInput {
  pub fn new(parameter: ParameterDef) -> Self {
    Self {
      parameter,
      position: None,
    }
  }

  pub fn at(mut self, position: Point) -> Self {
    self.position = Some(position);
    self
  }

  pub fn name(&self) -> &str {
    &self.parameter.name
  }
}

impl ModelOutput {
  pub fn new(description: impl Into<String>) -> Self {
    Self {
      description: description.into(),
      position: None,
    }
  }
}

impl ModelNode {
  pub fn new(algorithm_id: impl Into<String>) -> Self {
    Self {
      name: String::new(),
      algorithm_id: algorithm_id.into(),
      description: String::new(),
      bindings: BTreeMap::new(),
      outputs: BTreeMap::new(),
      position: None,
      dependencies: Vec::new(),
      active: true,
      params_folded: true,
      outputs_folded: true,
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn bind(mut self, parameter: impl Into<String>, value: ValueExpression) -> Self {
    self.bindings.insert(parameter.into(), value);
    self
  }

  pub fn expose(mut self, output: impl Into<String>, description: impl Into<String>) -> Self {
    self
      .outputs
      .insert(output.into(), ModelOutput::new(description));
    self
  }

  pub fn with_dependency(mut self, node: impl Into<String>) -> Self {
    self.dependencies.push(node.into());
    self
  }

  pub fn at(mut self, position: Point) -> Self {
    self.position = Some(position);
    self
  }

  /// Names of the nodes this node reads from directly: `FromOutput`
  /// producers anywhere in its bindings plus explicit dependencies.
  pub fn producers(&self) -> Vec<&str> {
    let mut producers: Vec<&str> = self
      .bindings
      .values()
      .flat_map(|value| value.output_refs())
      .map(|(node, _)| node)
      .chain(self.dependencies.iter().map(String::as_str))
      .collect();
    producers.sort_unstable();
    producers.dedup();
    producers
  }

  /// Whether any binding reads the given model input.
  pub fn reads_input(&self, input: &str) -> bool {
    self
      .bindings
      .values()
      .any(|value| value.input_refs().contains(&input))
  }

  /// Whether any binding reads an output of the given node.
  pub fn reads_node(&self, node: &str) -> bool {
    self
      .bindings
      .values()
      .any(|value| value.output_refs().iter().any(|(n, _)| *n == node))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_producers_include_nested_and_explicit() {
    let node = ModelNode::new("qgis:union")
      .bind("INPUT", ValueExpression::from_output("BUFFER_1", "OUTPUT"))
      .bind(
        "OVERLAY",
        ValueExpression::List(vec![
          ValueExpression::from_output("CLIP_1", "OUTPUT"),
          ValueExpression::from_output("BUFFER_1", "OUTPUT"),
        ]),
      )
      .with_dependency("ZLAST_1");

    assert_eq!(node.producers(), vec!["BUFFER_1", "CLIP_1", "ZLAST_1"]);
    assert!(node.reads_node("CLIP_1"));
    assert!(!node.reads_node("ZLAST_1"));
  }

  #[test]
  fn test_reads_input() {
    let node = ModelNode::new("qgis:buffer").bind(
      "DISTANCE",
      ValueExpression::compound(vec![ValueExpression::from_input("radius")], "{{ inputs.radius }}"),
    );
    assert!(node.reads_input("radius"));
    assert!(!node.reads_input("other"));
  }
}
