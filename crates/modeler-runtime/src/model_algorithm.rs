//! A model packaged as an algorithm.
//!
//! Wrapping a [`ModelGraph`] in a [`ModelAlgorithm`] gives it the same
//! surface as any leaf algorithm: the model inputs become its parameters and
//! the exposed node outputs become its outputs. That is what lets a model
//! run as a single node inside another model.

use std::sync::Arc;

use modeler_catalog::{Algorithm, AlgorithmError, Catalog, Feedback, ValueMap};
use modeler_model::{ModelGraph, safe_name};
use modeler_parameters::{OutputDef, ParameterDef};

use crate::error::RuntimeError;
use crate::executor::Executor;

#[derive(Clone)]
pub struct ModelAlgorithm {
  id: String,
  graph: Arc<ModelGraph>,
  executor: Executor,
  parameters: Vec<ParameterDef>,
  outputs: Vec<OutputDef>,
}

impl ModelAlgorithm {
  /// Wrap `graph`, running its nodes against `catalog`.
  ///
  /// The id is the model's command line name, or `modeler:<safe name>` for
  /// models that were not loaded from a file.
  pub fn new(graph: ModelGraph, catalog: Arc<dyn Catalog>) -> Result<Self, RuntimeError> {
    graph.check_runnable(catalog.as_ref())?;

    let id = match graph.command_line_name() {
      name if name.is_empty() => format!("modeler:{}", safe_name(&graph.name)),
      name => name,
    };
    let parameters = graph.parameter_definitions();
    let outputs = graph.output_definitions(catalog.as_ref())?;

    Ok(Self {
      id,
      graph: Arc::new(graph),
      executor: Executor::new(catalog),
      parameters,
      outputs,
    })
  }

  pub fn graph(&self) -> &ModelGraph {
    &self.graph
  }
}

impl Algorithm for ModelAlgorithm {
  fn id(&self) -> &str {
    &self.id
  }

  fn display_name(&self) -> &str {
    &self.graph.name
  }

  fn group(&self) -> &str {
    &self.graph.group
  }

  fn parameters(&self) -> &[ParameterDef] {
    &self.parameters
  }

  fn outputs(&self) -> &[OutputDef] {
    &self.outputs
  }

  fn get_copy(&self) -> Box<dyn Algorithm> {
    Box::new(self.clone())
  }

  fn execute(
    &mut self,
    parameters: &ValueMap,
    feedback: &dyn Feedback,
  ) -> Result<ValueMap, AlgorithmError> {
    match self.executor.execute(&self.graph, parameters, feedback) {
      Ok(result) => Ok(result.outputs),
      Err(RuntimeError::Cancelled) => Err(AlgorithmError::Cancelled),
      Err(e) => Err(AlgorithmError::execution(e.to_string())),
    }
  }
}
