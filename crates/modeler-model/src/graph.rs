//! The model graph.
//!
//! A [`ModelGraph`] owns the model inputs and the nodes, in declaration
//! order. Dependency edges are not stored; they are derived from the
//! `FromOutput` bindings and explicit dependencies of each node every time
//! they are needed, so editing a binding can never leave a stale edge behind.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use modeler_catalog::Catalog;
use modeler_parameters::{OutputDef, ParameterDef};
use tracing::debug;

use crate::error::ModelError;
use crate::node::{ModelInput, ModelNode};
use crate::point::Point;

/// Width of a node box on the canvas.
pub const BOX_WIDTH: f64 = 200.0;
/// Height of a node box on the canvas.
pub const BOX_HEIGHT: f64 = 30.0;

/// Name of the model output that exposes `output` of `node`.
pub fn safe_output_name(node: &str, output: &str) -> String {
  format!("{}_ALG{}", output, node)
}

/// A composite algorithm: a graph of algorithm invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGraph {
  pub name: String,
  pub group: String,
  /// The file the model was loaded from, if any.
  pub description_file: Option<PathBuf>,
  /// Help texts keyed by parameter name, plus `ALG_DESC` for the model.
  pub help_content: BTreeMap<String, String>,
  pub(crate) inputs: Vec<ModelInput>,
  pub(crate) nodes: Vec<ModelNode>,
}

impl Default for ModelGraph {
  fn default() -> Self {
    Self::new("Model", "")
  }
}

impl ModelGraph {
  pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      group: group.into(),
      description_file: None,
      help_content: BTreeMap::new(),
      inputs: Vec::new(),
      nodes: Vec::new(),
    }
  }

  /// Nodes in declaration order.
  pub fn nodes(&self) -> &[ModelNode] {
    &self.nodes
  }

  pub fn node(&self, name: &str) -> Option<&ModelNode> {
    self.nodes.iter().find(|n| n.name == name)
  }

  pub fn node_mut(&mut self, name: &str) -> Option<&mut ModelNode> {
    self.nodes.iter_mut().find(|n| n.name == name)
  }

  /// Model inputs in declaration order.
  pub fn inputs(&self) -> &[ModelInput] {
    &self.inputs
  }

  pub fn input(&self, name: &str) -> Option<&ModelInput> {
    self.inputs.iter().find(|i| i.name() == name)
  }

  // ---------------------------------------------------------------------
  // Editing
  // ---------------------------------------------------------------------

  /// Add a model input. Input names are unique.
  pub fn add_parameter(&mut self, input: ModelInput) -> Result<(), ModelError> {
    if self.input(input.name()).is_some() {
      return Err(ModelError::DuplicateInput(input.name().to_string()));
    }
    self.inputs.push(input);
    Ok(())
  }

  /// Replace the definition of an existing input, keeping its position.
  pub fn update_parameter(&mut self, parameter: ParameterDef) -> Result<(), ModelError> {
    let input = self
      .inputs
      .iter_mut()
      .find(|i| i.parameter.name == parameter.name)
      .ok_or_else(|| ModelError::InputNotFound(parameter.name.clone()))?;
    input.parameter = parameter;
    Ok(())
  }

  /// Remove a model input.
  ///
  /// Returns `false` and leaves the model untouched if the input does not
  /// exist or some node reads it.
  pub fn remove_parameter(&mut self, name: &str) -> bool {
    if self.input(name).is_none() || self.has_dependencies(name) {
      return false;
    }
    self.inputs.retain(|i| i.name() != name);
    true
  }

  /// Add a node and return its name.
  ///
  /// A node without a name gets `<ALGORITHM_ID>_<n>` with the smallest
  /// free `n`. A named node must not clash with an existing one.
  pub fn add_algorithm(&mut self, mut node: ModelNode) -> Result<String, ModelError> {
    if node.name.is_empty() {
      node.name = self.name_for_algorithm(&node.algorithm_id);
    } else if self.node(&node.name).is_some() {
      return Err(ModelError::DuplicateNode(node.name));
    }
    debug!(node_id = %node.name, algorithm_id = %node.algorithm_id, "node added");
    let name = node.name.clone();
    self.nodes.push(node);
    Ok(name)
  }

  /// The name a new node running `algorithm_id` would get.
  pub fn name_for_algorithm(&self, algorithm_id: &str) -> String {
    let prefix = algorithm_id.to_uppercase().replace(':', "");
    let mut i = 1;
    while self.node(&format!("{}_{}", prefix, i)).is_some() {
      i += 1;
    }
    format!("{}_{}", prefix, i)
  }

  /// Replace the definition of an existing node.
  ///
  /// Canvas position, fold state and activation state are carried over from
  /// the previous definition. Exposed outputs without a position are laid
  /// out to the right of the node.
  pub fn update_algorithm(&mut self, mut node: ModelNode) -> Result<(), ModelError> {
    let existing = self
      .nodes
      .iter_mut()
      .find(|n| n.name == node.name)
      .ok_or_else(|| ModelError::NodeNotFound(node.name.clone()))?;

    node.position = existing.position;
    node.params_folded = existing.params_folded;
    node.outputs_folded = existing.outputs_folded;
    node.active = existing.active;

    let origin = node.position.unwrap_or_default();
    for (i, output) in node.outputs.values_mut().enumerate() {
      if output.position.is_none() {
        output.position = Some(origin.offset(BOX_WIDTH, (i as f64 + 1.5) * BOX_HEIGHT));
      }
    }

    *existing = node;
    Ok(())
  }

  /// Remove a node.
  ///
  /// Returns `false` and leaves the model untouched if the node does not
  /// exist or another element depends on it.
  pub fn remove_algorithm(&mut self, name: &str) -> bool {
    if self.node(name).is_none() || self.has_dependencies(name) {
      return false;
    }
    self.nodes.retain(|n| n.name != name);
    true
  }

  /// Bulk update of canvas positions. Unknown names are ignored.
  pub fn set_positions(
    &mut self,
    inputs: &HashMap<String, Point>,
    nodes: &HashMap<String, Point>,
    outputs: &HashMap<String, HashMap<String, Point>>,
  ) {
    for input in &mut self.inputs {
      if let Some(pos) = inputs.get(&input.parameter.name) {
        input.position = Some(*pos);
      }
    }
    for node in &mut self.nodes {
      if let Some(pos) = nodes.get(&node.name) {
        node.position = Some(*pos);
      }
      if let Some(positions) = outputs.get(&node.name) {
        for (output, pos) in positions {
          if let Some(exposed) = node.outputs.get_mut(output) {
            exposed.position = Some(*pos);
          }
        }
      }
    }
  }

  // ---------------------------------------------------------------------
  // Dependency analysis
  // ---------------------------------------------------------------------

  /// Whether some node depends on `name`, read either as a model input or
  /// as a producing node.
  pub fn has_dependencies(&self, name: &str) -> bool {
    self.nodes.iter().any(|node| {
      node.reads_input(name)
        || node.reads_node(name)
        || (node.name != name && node.dependencies.iter().any(|d| d == name))
    })
  }

  /// Every node `name` transitively depends on.
  ///
  /// The walk keeps a visited set, so it terminates on cyclic models; a
  /// node that is part of a cycle appears in its own result. Unknown names
  /// are reported but not expanded.
  pub fn depends_on(&self, name: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut stack: Vec<&str> = self.direct_producers(name);

    while let Some(current) = stack.pop() {
      if found.insert(current.to_string()) {
        stack.extend(self.direct_producers(current));
      }
    }

    found
  }

  /// Every node that transitively depends on `name`, including `name`.
  pub fn dependents(&self, name: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::from([name.to_string()]);
    let mut stack = vec![name.to_string()];

    while let Some(current) = stack.pop() {
      for node in &self.nodes {
        if node.producers().contains(&current.as_str()) && found.insert(node.name.clone()) {
          stack.push(node.name.clone());
        }
      }
    }

    found
  }

  /// The first node, in declaration order, that depends on itself.
  pub fn find_cycle(&self) -> Option<&str> {
    self
      .nodes
      .iter()
      .find(|node| self.depends_on(&node.name).contains(&node.name))
      .map(|node| node.name.as_str())
  }

  fn direct_producers(&self, name: &str) -> Vec<&str> {
    self
      .node(name)
      .map(|node| node.producers())
      .unwrap_or_default()
  }

  // ---------------------------------------------------------------------
  // Activation
  // ---------------------------------------------------------------------

  /// Deactivate a node and everything downstream of it.
  pub fn deactivate_algorithm(&mut self, name: &str) {
    let dependents = self.dependents(name);
    for node in &mut self.nodes {
      if dependents.contains(&node.name) {
        node.active = false;
      }
    }
  }

  /// Activate a node.
  ///
  /// Returns `false` without changing anything if the node is unknown or any
  /// node it depends on is missing or inactive.
  pub fn activate_algorithm(&mut self, name: &str) -> bool {
    if self.node(name).is_none() {
      return false;
    }
    let prerequisites_active = self
      .depends_on(name)
      .iter()
      .all(|dep| self.node(dep).is_some_and(|n| n.active));
    if !prerequisites_active {
      return false;
    }
    if let Some(node) = self.node_mut(name) {
      node.active = true;
    }
    true
  }

  // ---------------------------------------------------------------------
  // Scheduling
  // ---------------------------------------------------------------------

  /// Execution order of the active nodes.
  ///
  /// Nodes are taken in declaration order, pass after pass; a node is ready
  /// once everything it depends on (other than itself) has been scheduled.
  /// A pass that schedules nothing means the remaining nodes sit on a cycle
  /// or wait for a missing or inactive node.
  pub fn schedule(&self) -> Result<Vec<String>, ModelError> {
    let to_execute: Vec<&ModelNode> = self.nodes.iter().filter(|n| n.active).collect();
    let mut executed: Vec<String> = Vec::with_capacity(to_execute.len());
    let mut done: HashSet<&str> = HashSet::new();

    while executed.len() < to_execute.len() {
      let before = executed.len();

      for node in &to_execute {
        if done.contains(node.name.as_str()) {
          continue;
        }
        let ready = self
          .depends_on(&node.name)
          .iter()
          .all(|dep| *dep == node.name || done.contains(dep.as_str()));
        if ready {
          done.insert(node.name.as_str());
          executed.push(node.name.clone());
        }
      }

      if executed.len() == before {
        let pending = to_execute
          .iter()
          .filter(|n| !done.contains(n.name.as_str()))
          .map(|n| n.name.clone())
          .collect();
        return Err(ModelError::CycleOrUnmetDependency { pending });
      }
    }

    Ok(executed)
  }

  // ---------------------------------------------------------------------
  // Validation
  // ---------------------------------------------------------------------

  /// Check that every node's algorithm is available.
  pub fn check_runnable(&self, catalog: &dyn Catalog) -> Result<(), ModelError> {
    for node in &self.nodes {
      if !catalog.contains(&node.algorithm_id) {
        return Err(ModelError::MissingAlgorithm {
          node_id: node.name.clone(),
          algorithm_id: node.algorithm_id.clone(),
        });
      }
    }
    Ok(())
  }

  /// Check that every reference in an active node points at an existing
  /// model input, or at an existing, active node declaring that output.
  pub fn validate_references(&self, catalog: &dyn Catalog) -> Result<(), ModelError> {
    for node in self.nodes.iter().filter(|n| n.active) {
      let invalid = |message: String| ModelError::InvalidReference {
        node_id: node.name.clone(),
        message,
      };

      for (parameter, value) in &node.bindings {
        for input in value.input_refs() {
          if self.input(input).is_none() {
            return Err(invalid(format!(
              "parameter '{}' reads unknown model input '{}'",
              parameter, input
            )));
          }
        }

        for (producer, output) in value.output_refs() {
          let Some(source) = self.node(producer) else {
            return Err(invalid(format!(
              "parameter '{}' reads unknown node '{}'",
              parameter, producer
            )));
          };
          if !source.active {
            return Err(invalid(format!(
              "parameter '{}' reads inactive node '{}'",
              parameter, producer
            )));
          }
          let declares_output = catalog
            .get(&source.algorithm_id)
            .is_some_and(|alg| alg.output(output).is_some());
          if !declares_output {
            return Err(invalid(format!(
              "parameter '{}' reads output '{}' which node '{}' does not produce",
              parameter, output, producer
            )));
          }
        }
      }

      for dep in &node.dependencies {
        if self.node(dep).is_none() {
          return Err(invalid(format!("depends on unknown node '{}'", dep)));
        }
      }
    }
    Ok(())
  }

  // ---------------------------------------------------------------------
  // Characteristics
  // ---------------------------------------------------------------------

  /// The model's own parameters: every input's definition, deduplicated by
  /// name and sorted by description.
  pub fn parameter_definitions(&self) -> Vec<ParameterDef> {
    let mut seen = HashSet::new();
    let mut parameters: Vec<ParameterDef> = self
      .inputs
      .iter()
      .filter(|i| seen.insert(i.parameter.name.clone()))
      .map(|i| i.parameter.clone())
      .collect();
    parameters.sort_by(|a, b| a.description.cmp(&b.description));
    parameters
  }

  /// The model's own outputs: one per exposed output of an active node,
  /// named with [`safe_output_name`] and sorted by description.
  pub fn output_definitions(&self, catalog: &dyn Catalog) -> Result<Vec<OutputDef>, ModelError> {
    let mut outputs = Vec::new();
    for node in self.nodes.iter().filter(|n| n.active) {
      if node.outputs.is_empty() {
        continue;
      }
      let algorithm =
        catalog
          .get(&node.algorithm_id)
          .ok_or_else(|| ModelError::MissingAlgorithm {
            node_id: node.name.clone(),
            algorithm_id: node.algorithm_id.clone(),
          })?;
      for (name, exposed) in &node.outputs {
        let declared = algorithm
          .output(name)
          .ok_or_else(|| ModelError::InvalidReference {
            node_id: node.name.clone(),
            message: format!("exposes unknown output '{}'", name),
          })?;
        outputs.push(OutputDef::new(
          safe_output_name(&node.name, name),
          &exposed.description,
          declared.kind,
        ));
      }
    }
    outputs.sort_by(|a, b| a.description.cmp(&b.description));
    Ok(outputs)
  }

  /// Short description of the model, from the `ALG_DESC` help entry.
  pub fn short_help(&self) -> Option<&str> {
    self.help_content.get("ALG_DESC").map(String::as_str)
  }

  /// Help texts for the model's parameters, keyed by parameter name.
  pub fn parameter_descriptions(&self) -> BTreeMap<String, String> {
    self
      .inputs
      .iter()
      .filter_map(|i| {
        self
          .help_content
          .get(i.name())
          .map(|text| (i.name().to_string(), text.clone()))
      })
      .collect()
  }

  /// Command line name, `modeler:<file stem>` for models loaded from disk.
  pub fn command_line_name(&self) -> String {
    self
      .description_file
      .as_deref()
      .and_then(Path::file_stem)
      .map(|stem| format!("modeler:{}", stem.to_string_lossy().to_lowercase()))
      .unwrap_or_default()
  }
}
