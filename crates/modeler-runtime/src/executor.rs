//! Model executor.
//!
//! The [`Executor`] is the main entry point for running models. It owns the
//! catalogue the nodes' algorithms come from and provides
//! `execute(graph, inputs, feedback)` to run a full model.
//!
//! Execution is synchronous and sequential: nodes run one at a time on the
//! caller's thread, in the order computed by [`ModelGraph::schedule`].
//! Everything that can be checked up front is checked before the first node
//! runs, and the first node failure stops the run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use modeler_catalog::{Algorithm, AlgorithmError, Catalog, Feedback, ValueMap};
use modeler_model::{ModelError, ModelGraph, ModelNode, safe_output_name};
use modeler_parameters::display_value;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::error::RuntimeError;
use crate::resolve::{normalize_inputs, resolve_value};
use crate::result::{ExecutionResult, NodeResult};

/// Runs models against a catalogue of algorithms.
#[derive(Clone)]
pub struct Executor {
  catalog: Arc<dyn Catalog>,
}

/// State shared by every node of one execution.
struct Run<'a> {
  execution_id: &'a str,
  inputs: ValueMap,
  produced: HashMap<String, ValueMap>,
  feedback: &'a dyn Feedback,
  total: usize,
}

impl Executor {
  pub fn new(catalog: Arc<dyn Catalog>) -> Self {
    Self { catalog }
  }

  /// Get the catalogue algorithms are looked up in.
  pub fn catalog(&self) -> &Arc<dyn Catalog> {
    &self.catalog
  }

  /// Execute the model with the given input values.
  #[instrument(
    name = "model_execute",
    skip(self, graph, inputs, feedback),
    fields(model = %graph.name)
  )]
  pub fn execute(
    &self,
    graph: &ModelGraph,
    inputs: &ValueMap,
    feedback: &dyn Feedback,
  ) -> Result<ExecutionResult, RuntimeError> {
    let execution_id = uuid::Uuid::new_v4().to_string();

    info!(
      execution_id = %execution_id,
      model = %graph.name,
      nodes = graph.nodes().len(),
      "model_started"
    );

    let result = self.run(graph, inputs, feedback, &execution_id);

    match &result {
      Ok(result) => {
        info!(
          execution_id = %execution_id,
          executed = result.order.len(),
          "model_completed"
        );
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "model_failed");
      }
    }

    result
  }

  fn run(
    &self,
    graph: &ModelGraph,
    inputs: &ValueMap,
    feedback: &dyn Feedback,
    execution_id: &str,
  ) -> Result<ExecutionResult, RuntimeError> {
    graph.check_runnable(self.catalog.as_ref())?;
    graph.validate_references(self.catalog.as_ref())?;
    // The scheduler tolerates a node naming itself as a dependency, but a
    // binding reading the node's own output can never be satisfied.
    if let Some(node) = graph
      .nodes()
      .iter()
      .find(|n| n.active && n.reads_node(&n.name))
    {
      return Err(RuntimeError::CycleOrUnmetDependency {
        pending: vec![node.name.clone()],
      });
    }
    let order = graph.schedule()?;

    let mut run = Run {
      execution_id,
      inputs: normalize_inputs(graph, inputs)?,
      produced: HashMap::new(),
      feedback,
      total: order.len(),
    };

    let mut node_results = HashMap::with_capacity(order.len());
    let mut outputs = ValueMap::new();

    for (i, node_id) in order.iter().enumerate() {
      if feedback.is_canceled() {
        warn!(execution_id = %execution_id, node_id = %node_id, "model cancelled");
        return Err(RuntimeError::Cancelled);
      }

      let node = graph
        .node(node_id)
        .ok_or_else(|| RuntimeError::Model(ModelError::NodeNotFound(node_id.clone())))?;

      let result = self.run_node(&run, node, i)?;

      for name in node.outputs.keys() {
        match result.outputs.get(name) {
          Some(value) => {
            outputs.insert(safe_output_name(&node.name, name), value.clone());
          }
          None => {
            warn!(
              execution_id = %execution_id,
              node_id = %node.name,
              output = %name,
              "exposed output was not produced"
            );
          }
        }
      }

      feedback.set_progress(100.0 * (i + 1) as f64 / run.total as f64);
      run.produced.insert(node_id.clone(), result.outputs.clone());
      node_results.insert(node_id.clone(), result);
    }

    feedback.push_info(&format!(
      "Model processed ok. Executed {} algorithms total",
      run.total
    ));

    Ok(ExecutionResult {
      execution_id: execution_id.to_string(),
      order,
      node_results,
      outputs,
    })
  }

  /// Prepare and execute a single node.
  fn run_node(&self, run: &Run<'_>, node: &ModelNode, index: usize) -> Result<NodeResult, RuntimeError> {
    let feedback = run.feedback;
    let definition =
      self
        .catalog
        .get(&node.algorithm_id)
        .ok_or_else(|| RuntimeError::MissingAlgorithm {
          node_id: node.name.clone(),
          algorithm_id: node.algorithm_id.clone(),
        })?;

    feedback.push_debug_info(&format!("Prepare algorithm: {}", node.name));
    let mut algorithm = definition.get_copy();
    let parameters = self.prepare_parameters(run, node, algorithm.as_ref())?;

    let description = if node.description.is_empty() {
      algorithm.display_name().to_string()
    } else {
      node.description.clone()
    };

    let message = format!("Running {} [{}/{}]", description, index + 1, run.total);
    feedback.set_progress_text(&message);
    feedback.push_info(&message);
    info!(
      execution_id = %run.execution_id,
      node_id = %node.name,
      algorithm_id = %node.algorithm_id,
      "node_started"
    );

    let started = Instant::now();
    match algorithm.execute(&parameters, feedback) {
      Ok(outputs) => {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        feedback.push_info(&format!(
          "OK. Execution took {:.3} ms ({} outputs).",
          elapsed_ms,
          outputs.len()
        ));
        info!(
          execution_id = %run.execution_id,
          node_id = %node.name,
          elapsed_ms,
          "node_completed"
        );
        Ok(NodeResult {
          node_id: node.name.clone(),
          algorithm_id: node.algorithm_id.clone(),
          parameters,
          outputs,
          elapsed_ms,
        })
      }
      Err(AlgorithmError::Cancelled) => {
        warn!(execution_id = %run.execution_id, node_id = %node.name, "node cancelled");
        Err(RuntimeError::Cancelled)
      }
      Err(e) => {
        feedback.push_info("Failed");
        error!(
          execution_id = %run.execution_id,
          node_id = %node.name,
          error = %e,
          "node_failed"
        );
        Err(RuntimeError::NodeExecution {
          node_id: node.name.clone(),
          description,
          message: e.to_string(),
        })
      }
    }
  }

  /// Resolve and normalize every parameter the algorithm declares.
  fn prepare_parameters(
    &self,
    run: &Run<'_>,
    node: &ModelNode,
    algorithm: &dyn Algorithm,
  ) -> Result<ValueMap, RuntimeError> {
    let mut parameters = ValueMap::new();

    for param in algorithm.parameters() {
      let raw = match node.bindings.get(&param.name) {
        Some(expression) => resolve_value(&node.name, expression, &run.inputs, &run.produced)?,
        None => {
          warn!(
            execution_id = %run.execution_id,
            node_id = %node.name,
            parameter = %param.name,
            "parameter not bound, using its default"
          );
          param.default.clone().unwrap_or(Value::Null)
        }
      };

      let value = param
        .set_value(&raw)
        .map_err(|e| RuntimeError::InvalidParameterValue {
          node_id: node.name.clone(),
          parameter: param.name.clone(),
          value: display_value(&raw),
          message: e.to_string(),
        })?;
      parameters.insert(param.name.clone(), value);
    }

    Ok(parameters)
  }
}
