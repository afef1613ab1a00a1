//! Execution result types.

use std::collections::HashMap;

use modeler_catalog::ValueMap;
use serde::{Deserialize, Serialize};

/// Result of a single node execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
  /// Node that was executed.
  pub node_id: String,
  /// Algorithm the node ran.
  pub algorithm_id: String,
  /// Parameter values after resolution and normalization.
  pub parameters: ValueMap,
  /// Everything the algorithm produced, keyed by output name.
  pub outputs: ValueMap,
  /// Wall clock time spent in the algorithm.
  pub elapsed_ms: f64,
}

/// Result of a complete model execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
  /// Unique execution ID.
  pub execution_id: String,
  /// Node names in the order they ran.
  pub order: Vec<String>,
  /// Results of all executed nodes, keyed by node name.
  pub node_results: HashMap<String, NodeResult>,
  /// Exposed outputs keyed by `<output>_ALG<node>`.
  pub outputs: ValueMap,
}
