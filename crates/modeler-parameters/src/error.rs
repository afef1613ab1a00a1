use thiserror::Error;

/// Errors raised while normalizing a parameter value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
  /// The value cannot be accepted by the parameter.
  #[error("wrong value {value} for {kind} '{name}': {message}")]
  InvalidValue {
    name: String,
    kind: String,
    value: String,
    message: String,
  },
}
