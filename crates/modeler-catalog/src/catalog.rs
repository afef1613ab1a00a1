use std::collections::HashMap;
use std::sync::Arc;

use crate::algorithm::Algorithm;
use crate::error::CatalogError;

/// Lookup of algorithm definitions by identifier.
pub trait Catalog: Send + Sync {
  /// Get an algorithm definition by id.
  fn get(&self, id: &str) -> Option<Arc<dyn Algorithm>>;

  /// List all available algorithms, sorted by id.
  fn list(&self) -> Vec<Arc<dyn Algorithm>>;

  fn contains(&self, id: &str) -> bool {
    self.get(id).is_some()
  }
}

/// A catalogue of algorithms registered in code.
#[derive(Default, Clone)]
pub struct MemoryCatalog {
  algorithms: HashMap<String, Arc<dyn Algorithm>>,
}

impl MemoryCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an algorithm. Fails if the id is already taken.
  pub fn register(&mut self, algorithm: Arc<dyn Algorithm>) -> Result<(), CatalogError> {
    let id = algorithm.id().to_string();
    if self.algorithms.contains_key(&id) {
      return Err(CatalogError::Duplicate(id));
    }
    self.algorithms.insert(id, algorithm);
    Ok(())
  }

  /// Register an algorithm, replacing any previous definition with the same id.
  pub fn insert(&mut self, algorithm: Arc<dyn Algorithm>) {
    self
      .algorithms
      .insert(algorithm.id().to_string(), algorithm);
  }

  /// Builder-style registration, replacing duplicates.
  pub fn with(mut self, algorithm: impl Algorithm + 'static) -> Self {
    self.insert(Arc::new(algorithm));
    self
  }

  pub fn len(&self) -> usize {
    self.algorithms.len()
  }

  pub fn is_empty(&self) -> bool {
    self.algorithms.is_empty()
  }
}

impl Catalog for MemoryCatalog {
  fn get(&self, id: &str) -> Option<Arc<dyn Algorithm>> {
    self.algorithms.get(id).cloned()
  }

  fn list(&self) -> Vec<Arc<dyn Algorithm>> {
    let mut algorithms: Vec<_> = self.algorithms.values().cloned().collect();
    algorithms.sort_by(|a, b| a.id().cmp(b.id()));
    algorithms
  }
}

impl std::fmt::Debug for MemoryCatalog {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut ids: Vec<_> = self.algorithms.keys().collect();
    ids.sort();
    f.debug_struct("MemoryCatalog").field("algorithms", &ids).finish()
  }
}
