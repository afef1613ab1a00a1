//! Source listing of a model as a pseudo-script.
//!
//! The listing is meant for reading, not for running: a header declaring the
//! model's name, inputs and exposed outputs, followed by one `run` call per
//! node in execution order.

use std::sync::Arc;

use modeler_catalog::{Algorithm, Catalog};

use crate::error::ModelError;
use crate::graph::ModelGraph;

/// Keep only ASCII letters, lowercased.
pub fn safe_name(text: &str) -> String {
  text
    .to_lowercase()
    .chars()
    .filter(|c| c.is_ascii_lowercase())
    .collect()
}

impl ModelGraph {
  /// Render the model as a script listing.
  ///
  /// ```text
  /// ##Buffered centroids=name
  /// ##radius=number 5
  /// ##centroid=output vector
  /// outputs_BUFFER_1=run('demo:buffer', 'roads.shp',radius,None)
  /// outputs_CENTROID_1=run('demo:centroids', outputs_BUFFER_1['OUTPUT'],centroid)
  /// ```
  pub fn to_source_listing(&self, catalog: &dyn Catalog) -> Result<String, ModelError> {
    let mut lines = vec![format!("##{}=name", self.name)];

    for input in self.inputs() {
      lines.push(input.parameter.script_code());
    }

    for node in self.nodes() {
      if node.outputs.is_empty() {
        continue;
      }
      let algorithm = lookup(catalog, &node.name, &node.algorithm_id)?;
      for (name, exposed) in &node.outputs {
        let keyword = algorithm
          .output(name)
          .map(|o| o.kind.script_keyword())
          .ok_or_else(|| ModelError::InvalidReference {
            node_id: node.name.clone(),
            message: format!("exposes unknown output '{}'", name),
          })?;
        lines.push(format!("##{}={}", safe_name(&exposed.description), keyword));
      }
    }

    for name in self.schedule()? {
      let Some(node) = self.node(&name) else {
        continue;
      };
      let algorithm = lookup(catalog, &node.name, &node.algorithm_id)?;

      let mut args: Vec<String> = algorithm
        .parameters()
        .iter()
        .map(|p| {
          node
            .bindings
            .get(&p.name)
            .map(|value| value.as_script())
            .unwrap_or_else(|| "None".to_string())
        })
        .collect();
      args.extend(algorithm.outputs().iter().map(|o| {
        node
          .outputs
          .get(&o.name)
          .map(|exposed| safe_name(&exposed.description))
          .unwrap_or_else(|| "None".to_string())
      }));

      lines.push(format!(
        "outputs_{}=run('{}', {})",
        node.name,
        node.algorithm_id,
        args.join(",")
      ));
    }

    Ok(lines.join("\n"))
  }
}

fn lookup(
  catalog: &dyn Catalog,
  node_id: &str,
  algorithm_id: &str,
) -> Result<Arc<dyn Algorithm>, ModelError> {
  catalog
    .get(algorithm_id)
    .ok_or_else(|| ModelError::MissingAlgorithm {
      node_id: node_id.to_string(),
      algorithm_id: algorithm_id.to_string(),
    })
}
