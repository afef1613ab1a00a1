use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("algorithm not found: {0}")]
  NotFound(String),

  #[error("algorithm '{0}' is already registered")]
  Duplicate(String),

  #[error("invalid algorithm descriptor {path}: {message}")]
  InvalidDescriptor { path: PathBuf, message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}
