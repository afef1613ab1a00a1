//! The algorithm contract.

use std::collections::HashMap;

use modeler_parameters::{OutputDef, ParameterDef};
use thiserror::Error;

use crate::feedback::Feedback;

/// Parameter or output values keyed by name.
pub type ValueMap = HashMap<String, serde_json::Value>;

/// Errors raised by an algorithm while executing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlgorithmError {
  /// The algorithm failed; the message is meant for the user.
  #[error("{message}")]
  Execution { message: String },

  /// The algorithm noticed the cancellation flag and stopped.
  #[error("execution cancelled")]
  Cancelled,
}

impl AlgorithmError {
  pub fn execution(message: impl Into<String>) -> Self {
    Self::Execution {
      message: message.into(),
    }
  }
}

/// A reusable algorithm definition.
///
/// Catalogues hand out shared definitions; the runtime calls
/// [`Algorithm::get_copy`] to obtain a fresh, owned instance for every
/// execution so no state leaks between runs.
pub trait Algorithm: Send + Sync {
  /// Catalogue identifier, e.g. `qgis:buffer`.
  fn id(&self) -> &str;

  /// Human readable name.
  fn display_name(&self) -> &str {
    self.id()
  }

  fn group(&self) -> &str {
    ""
  }

  /// Declared parameters, in declaration order.
  fn parameters(&self) -> &[ParameterDef];

  /// Declared outputs, in declaration order.
  fn outputs(&self) -> &[OutputDef];

  /// A fresh, unbound instance of this algorithm.
  fn get_copy(&self) -> Box<dyn Algorithm>;

  /// Run the algorithm with normalized parameter values.
  ///
  /// Returns the produced output values keyed by output name. Long running
  /// implementations should poll [`Feedback::is_canceled`].
  fn execute(
    &mut self,
    parameters: &ValueMap,
    feedback: &dyn Feedback,
  ) -> Result<ValueMap, AlgorithmError>;

  fn parameter(&self, name: &str) -> Option<&ParameterDef> {
    self.parameters().iter().find(|p| p.name == name)
  }

  fn output(&self, name: &str) -> Option<&OutputDef> {
    self.outputs().iter().find(|o| o.name == name)
  }
}
