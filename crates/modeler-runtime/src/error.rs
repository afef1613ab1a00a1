//! Runtime error types.

use modeler_model::ModelError;

/// Errors that can occur while running a model.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// Execution was cancelled through the feedback object.
  #[error("execution cancelled")]
  Cancelled,

  /// The schedule could not make progress.
  #[error("model contains a cycle or an unmet dependency; cannot run: {}", pending.join(", "))]
  CycleOrUnmetDependency { pending: Vec<String> },

  /// A node's algorithm is not in the catalogue.
  #[error("node '{node_id}' uses an algorithm that is not available: {algorithm_id}")]
  MissingAlgorithm {
    node_id: String,
    algorithm_id: String,
  },

  /// A binding points at a missing or inactive producer.
  #[error("invalid reference in node '{node_id}': {message}")]
  InvalidReference { node_id: String, message: String },

  /// A host-supplied value for a model input was rejected.
  #[error("wrong value for model input '{name}': {message}")]
  InvalidInput { name: String, message: String },

  /// A bound value could not be computed.
  #[error("input resolution failed for node '{node_id}': {message}")]
  InputResolution { node_id: String, message: String },

  /// A resolved value was rejected by the parameter definition.
  #[error("wrong value '{value}' for parameter '{parameter}' of node '{node_id}': {message}")]
  InvalidParameterValue {
    node_id: String,
    parameter: String,
    value: String,
    message: String,
  },

  /// The algorithm of a node failed.
  #[error("error executing algorithm '{description}' ({node_id}): {message}")]
  NodeExecution {
    node_id: String,
    description: String,
    message: String,
  },

  #[error(transparent)]
  Model(ModelError),
}

impl From<ModelError> for RuntimeError {
  fn from(error: ModelError) -> Self {
    match error {
      ModelError::CycleOrUnmetDependency { pending } => Self::CycleOrUnmetDependency { pending },
      ModelError::MissingAlgorithm {
        node_id,
        algorithm_id,
      } => Self::MissingAlgorithm {
        node_id,
        algorithm_id,
      },
      ModelError::InvalidReference { node_id, message } => {
        Self::InvalidReference { node_id, message }
      }
      other => Self::Model(other),
    }
  }
}
