use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("model input not found: {0}")]
  InputNotFound(String),

  #[error("a node named '{0}' already exists")]
  DuplicateNode(String),

  #[error("a model input named '{0}' already exists")]
  DuplicateInput(String),

  #[error("node '{node_id}' uses an algorithm that is not available: {algorithm_id}")]
  MissingAlgorithm {
    node_id: String,
    algorithm_id: String,
  },

  #[error("invalid reference in node '{node_id}': {message}")]
  InvalidReference { node_id: String, message: String },

  #[error("model contains a cycle or an unmet dependency; cannot schedule: {}", pending.join(", "))]
  CycleOrUnmetDependency { pending: Vec<String> },

  #[error("malformed model: {message} (at {fragment})")]
  Format { fragment: String, message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}
