//! Value expressions bound to node parameters.
//!
//! A binding says how a parameter gets its value when the model runs:
//!
//! - `Literal`: a fixed value stored in the model.
//! - `FromInput`: the value the host supplies for a model input.
//! - `FromOutput`: a value produced by another node. This is the only kind
//!   of binding that creates a dependency edge between nodes.
//! - `List`: several expressions, passed on as one `;`-separated value.
//! - `Compound`: a minijinja template (`definition`) rendered over the
//!   resolved `values`.

use std::fmt;

use modeler_parameters::display_value;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpression {
  /// A fixed value. Only scalars and objects without a `class` key can be
  /// saved; build arrays with [`ValueExpression::literal`].
  Literal(Value),
  FromInput {
    name: String,
  },
  FromOutput {
    node: String,
    output: String,
  },
  List(Vec<ValueExpression>),
  Compound {
    values: Vec<ValueExpression>,
    definition: String,
  },
}

impl ValueExpression {
  /// A literal value. JSON arrays become a [`ValueExpression::List`] of
  /// literals, which is how multi-value bindings are stored.
  pub fn literal(value: impl Into<Value>) -> Self {
    match value.into() {
      Value::Array(items) => Self::List(items.into_iter().map(Self::literal).collect()),
      other => Self::Literal(other),
    }
  }

  pub fn unset() -> Self {
    Self::Literal(Value::Null)
  }

  pub fn from_input(name: impl Into<String>) -> Self {
    Self::FromInput { name: name.into() }
  }

  pub fn from_output(node: impl Into<String>, output: impl Into<String>) -> Self {
    Self::FromOutput {
      node: node.into(),
      output: output.into(),
    }
  }

  pub fn compound(values: Vec<ValueExpression>, definition: impl Into<String>) -> Self {
    Self::Compound {
      values,
      definition: definition.into(),
    }
  }

  pub fn is_unset(&self) -> bool {
    matches!(self, Self::Literal(Value::Null))
  }

  /// Visit this expression and every nested sub-expression, depth first.
  pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ValueExpression)) {
    visit(self);
    match self {
      Self::List(values) | Self::Compound { values, .. } => {
        for value in values {
          value.walk(visit);
        }
      }
      Self::Literal(_) | Self::FromInput { .. } | Self::FromOutput { .. } => {}
    }
  }

  /// Every `(node, output)` pair this expression reads.
  pub fn output_refs(&self) -> Vec<(&str, &str)> {
    let mut refs = Vec::new();
    self.walk(&mut |expr| {
      if let Self::FromOutput { node, output } = expr {
        refs.push((node.as_str(), output.as_str()));
      }
    });
    refs
  }

  /// Every model input name this expression reads.
  pub fn input_refs(&self) -> Vec<&str> {
    let mut refs = Vec::new();
    self.walk(&mut |expr| {
      if let Self::FromInput { name } = expr {
        refs.push(name.as_str());
      }
    });
    refs
  }

  /// Render as a pseudo-script argument.
  pub fn as_script(&self) -> String {
    match self {
      Self::Literal(Value::Null) => "None".to_string(),
      Self::Literal(Value::String(s)) => quote(s),
      Self::Literal(other) => other.to_string(),
      Self::FromInput { name } => name.clone(),
      Self::FromOutput { node, output } => format!("outputs_{}['{}']", node, output),
      Self::List(values) => format!(
        "[{}]",
        values
          .iter()
          .map(|v| v.as_script())
          .collect::<Vec<_>>()
          .join(",")
      ),
      Self::Compound { definition, .. } => quote(definition),
    }
  }
}

fn quote(text: &str) -> String {
  format!("'{}'", text.lines().collect::<Vec<_>>().join("\\n"))
}

impl fmt::Display for ValueExpression {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Literal(value) => write!(f, "{}", display_value(value)),
      Self::FromInput { name } => write!(f, "{}", name),
      Self::FromOutput { node, output } => write!(f, "{}:{}", node, output),
      Self::List(values) => {
        let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join(";"))
      }
      Self::Compound { definition, .. } => write!(f, "{}", definition),
    }
  }
}
