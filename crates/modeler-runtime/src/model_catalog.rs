//! Catalogue of models stored on disk.
//!
//! Models are stored as `*.model` files in a single directory:
//! ```text
//! {root}/
//! ├── buffered_centroids.model
//! └── flood_zones.model
//! ```
//! Each model becomes a [`ModelAlgorithm`] layered over a base catalogue, so
//! a model may use leaf algorithms as well as other models.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use modeler_catalog::{Algorithm, Catalog, MemoryCatalog};
use modeler_model::ModelGraph;
use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::model_algorithm::ModelAlgorithm;

/// Models layered over a base catalogue.
///
/// Lookups check the models first, then the base catalogue.
#[derive(Clone)]
pub struct ModelCatalog {
  base: Arc<dyn Catalog>,
  models: MemoryCatalog,
}

impl ModelCatalog {
  pub fn new(base: Arc<dyn Catalog>) -> Self {
    Self {
      base,
      models: MemoryCatalog::new(),
    }
  }

  /// Load every `*.model` file found directly under `root`.
  ///
  /// Models may use each other in any file order. A model whose algorithms
  /// never become available (missing leaves, or models using each other in
  /// a loop) is skipped with a warning, and so is a file that does not parse
  /// or a model that exposes outputs its algorithms do not declare. A
  /// missing root directory yields a catalogue holding only the base
  /// algorithms.
  pub fn load(base: Arc<dyn Catalog>, root: impl AsRef<Path>) -> Result<Self, RuntimeError> {
    let root = root.as_ref();
    let mut catalog = Self::new(base);

    if !root.is_dir() {
      warn!(root = %root.display(), "model directory not found");
      return Ok(catalog);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(root)
      .map_err(|e| RuntimeError::Model(e.into()))?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "model"))
      .collect();
    paths.sort();

    let mut pending = Vec::with_capacity(paths.len());
    for path in paths {
      match ModelGraph::from_file(&path) {
        Ok(graph) => pending.push(graph),
        Err(e) => {
          warn!(path = %path.display(), error = %e, "skipping unreadable model file");
        }
      }
    }

    loop {
      let before = pending.len();
      let mut waiting = Vec::new();

      for graph in pending {
        let ready = graph.nodes().iter().all(|n| catalog.contains(&n.algorithm_id));
        if ready {
          let path = graph.description_file.clone();
          if let Err(e) = catalog.add_model(graph) {
            warn!(path = ?path, error = %e, "skipping invalid model");
          }
        } else {
          waiting.push(graph);
        }
      }

      pending = waiting;
      if pending.is_empty() || pending.len() == before {
        break;
      }
    }

    for graph in &pending {
      warn!(
        model = %graph.name,
        path = ?graph.description_file,
        "skipping model, some of its algorithms are not available"
      );
    }

    Ok(catalog)
  }

  /// Add a model, making it available to lookups and to models added later.
  pub fn add_model(&mut self, graph: ModelGraph) -> Result<String, RuntimeError> {
    let snapshot: Arc<dyn Catalog> = Arc::new(self.clone());
    let algorithm = ModelAlgorithm::new(graph, snapshot)?;
    let id = algorithm.id().to_string();
    debug!(id = %id, "loaded model");
    self.models.insert(Arc::new(algorithm));
    Ok(id)
  }

  /// Number of models, not counting the base catalogue.
  pub fn model_count(&self) -> usize {
    self.models.len()
  }
}

impl Catalog for ModelCatalog {
  fn get(&self, id: &str) -> Option<Arc<dyn Algorithm>> {
    self.models.get(id).or_else(|| self.base.get(id))
  }

  fn list(&self) -> Vec<Arc<dyn Algorithm>> {
    let mut algorithms = self.models.list();
    algorithms.extend(
      self
        .base
        .list()
        .into_iter()
        .filter(|a| self.models.get(a.id()).is_none()),
    );
    algorithms.sort_by(|a, b| a.id().cmp(b.id()));
    algorithms
  }
}
