use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::algorithm::Algorithm;
use crate::catalog::{Catalog, MemoryCatalog};
use crate::error::CatalogError;
use crate::template::{AlgorithmDescriptor, TemplateAlgorithm};

/// Filesystem-based algorithm catalogue.
///
/// Template algorithm descriptors are stored as JSON files:
/// ```text
/// {root}/
/// ├── demo--buffer.json
/// └── demo--centroids.json
/// ```
/// File names are not significant; the `id` inside the descriptor is.
pub struct FsCatalog {
  root: PathBuf,
  algorithms: MemoryCatalog,
}

impl FsCatalog {
  /// Load every `*.json` descriptor found directly under `root`.
  ///
  /// A missing root directory yields an empty catalogue.
  pub fn load(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
    let root = root.into();
    let mut algorithms = MemoryCatalog::new();

    if !root.is_dir() {
      warn!(root = %root.display(), "algorithm directory not found, catalogue is empty");
      return Ok(Self { root, algorithms });
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(&root)?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
      .collect();
    paths.sort();

    for path in paths {
      let descriptor = Self::read_descriptor(&path)?;
      debug!(id = %descriptor.id, path = %path.display(), "loaded algorithm descriptor");
      algorithms
        .register(Arc::new(TemplateAlgorithm::new(descriptor)))
        .map_err(|e| CatalogError::InvalidDescriptor {
          path: path.clone(),
          message: e.to_string(),
        })?;
    }

    Ok(Self { root, algorithms })
  }

  /// Get the root directory of the catalogue.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn read_descriptor(path: &Path) -> Result<AlgorithmDescriptor, CatalogError> {
    let content = fs::read_to_string(path)?;
    let descriptor: AlgorithmDescriptor =
      serde_json::from_str(&content).map_err(|e| CatalogError::InvalidDescriptor {
        path: path.to_path_buf(),
        message: e.to_string(),
      })?;

    if descriptor.id.trim().is_empty() {
      return Err(CatalogError::InvalidDescriptor {
        path: path.to_path_buf(),
        message: "descriptor has an empty id".to_string(),
      });
    }

    Ok(descriptor)
  }
}

impl Catalog for FsCatalog {
  fn get(&self, id: &str) -> Option<Arc<dyn Algorithm>> {
    self.algorithms.get(id)
  }

  fn list(&self) -> Vec<Arc<dyn Algorithm>> {
    self.algorithms.list()
  }
}
