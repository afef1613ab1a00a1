//! Template algorithms.
//!
//! A template algorithm is described entirely by data: a parameter list and
//! a list of outputs whose values are minijinja templates rendered against
//! the bound parameter values.
//!
//! ```json
//! {
//!   "id": "demo:buffer",
//!   "name": "Buffer",
//!   "group": "Vector geometry",
//!   "parameters": [
//!     { "name": "INPUT", "description": "Input layer", "type": "ParameterVector" },
//!     { "name": "DISTANCE", "description": "Distance", "type": "ParameterNumber", "default": 10 }
//!   ],
//!   "outputs": [
//!     { "name": "OUTPUT", "description": "Buffered", "type": "OutputVector",
//!       "template": "buffer({{ INPUT }}, {{ DISTANCE }})" }
//!   ]
//! }
//! ```

use minijinja::Environment;
use modeler_parameters::{OutputDef, OutputKind, ParameterDef};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::algorithm::{Algorithm, AlgorithmError, ValueMap};
use crate::feedback::Feedback;

/// On-disk description of a template algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmDescriptor {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default)]
  pub group: String,
  #[serde(default)]
  pub parameters: Vec<ParameterDef>,
  #[serde(default)]
  pub outputs: Vec<TemplateOutput>,
}

/// An output together with the template producing its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOutput {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(flatten)]
  pub kind: OutputKind,
  pub template: String,
}

/// An algorithm whose outputs are rendered from templates.
#[derive(Debug, Clone)]
pub struct TemplateAlgorithm {
  descriptor: AlgorithmDescriptor,
  outputs: Vec<OutputDef>,
}

impl TemplateAlgorithm {
  pub fn new(descriptor: AlgorithmDescriptor) -> Self {
    let outputs = descriptor
      .outputs
      .iter()
      .map(|o| OutputDef::new(&o.name, &o.description, o.kind))
      .collect();
    Self {
      descriptor,
      outputs,
    }
  }

  pub fn descriptor(&self) -> &AlgorithmDescriptor {
    &self.descriptor
  }
}

impl Algorithm for TemplateAlgorithm {
  fn id(&self) -> &str {
    &self.descriptor.id
  }

  fn display_name(&self) -> &str {
    self.descriptor.name.as_deref().unwrap_or(&self.descriptor.id)
  }

  fn group(&self) -> &str {
    &self.descriptor.group
  }

  fn parameters(&self) -> &[ParameterDef] {
    &self.descriptor.parameters
  }

  fn outputs(&self) -> &[OutputDef] {
    &self.outputs
  }

  fn get_copy(&self) -> Box<dyn Algorithm> {
    Box::new(self.clone())
  }

  fn execute(
    &mut self,
    parameters: &ValueMap,
    feedback: &dyn Feedback,
  ) -> Result<ValueMap, AlgorithmError> {
    let env = Environment::new();
    let context = minijinja::Value::from_serialize(parameters);
    let total = self.descriptor.outputs.len().max(1);

    let mut produced = ValueMap::new();
    for (i, output) in self.descriptor.outputs.iter().enumerate() {
      if feedback.is_canceled() {
        return Err(AlgorithmError::Cancelled);
      }

      let rendered = env
        .render_str(&output.template, context.clone())
        .map_err(|e| {
          AlgorithmError::execution(format!(
            "failed to render output '{}': {}",
            output.name, e
          ))
        })?;

      let value = match output.kind {
        OutputKind::Number => rendered
          .trim()
          .parse::<f64>()
          .ok()
          .and_then(serde_json::Number::from_f64)
          .map(Value::Number)
          .ok_or_else(|| {
            AlgorithmError::execution(format!(
              "output '{}' expected a number, got '{}'",
              output.name, rendered
            ))
          })?,
        _ => Value::String(rendered),
      };

      produced.insert(output.name.clone(), value);
      feedback.set_progress(((i + 1) * 100 / total) as f64);
    }

    Ok(produced)
  }
}
