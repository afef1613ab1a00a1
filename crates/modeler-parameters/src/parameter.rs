use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParameterError;

/// Definition of a single algorithm or model parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(flatten)]
  pub kind: ParameterKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<Value>,
  #[serde(default)]
  pub optional: bool,
}

/// The type of a parameter, with its type-specific constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParameterKind {
  #[serde(rename = "ParameterNumber")]
  Number {
    #[serde(default, rename = "minValue", skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, rename = "maxValue", skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(default, rename = "isInteger")]
    is_integer: bool,
  },
  #[serde(rename = "ParameterString")]
  String {
    #[serde(default)]
    multiline: bool,
  },
  #[serde(rename = "ParameterBoolean")]
  Boolean,
  #[serde(rename = "ParameterSelection")]
  Selection { options: Vec<String> },
  #[serde(rename = "ParameterVector")]
  Vector,
  #[serde(rename = "ParameterRaster")]
  Raster,
  #[serde(rename = "ParameterTable")]
  Table,
  #[serde(rename = "ParameterTableField")]
  TableField {
    #[serde(default)]
    parent: String,
  },
  #[serde(rename = "ParameterMultipleInput")]
  MultipleInput,
  #[serde(rename = "ParameterExtent")]
  Extent,
  #[serde(rename = "ParameterCrs")]
  Crs,
  #[serde(rename = "ParameterFile")]
  File {
    #[serde(default, rename = "isFolder")]
    is_folder: bool,
  },
}

impl ParameterKind {
  /// The serialized type tag, e.g. `ParameterNumber`.
  pub fn class_name(&self) -> &'static str {
    match self {
      Self::Number { .. } => "ParameterNumber",
      Self::String { .. } => "ParameterString",
      Self::Boolean => "ParameterBoolean",
      Self::Selection { .. } => "ParameterSelection",
      Self::Vector => "ParameterVector",
      Self::Raster => "ParameterRaster",
      Self::Table => "ParameterTable",
      Self::TableField { .. } => "ParameterTableField",
      Self::MultipleInput => "ParameterMultipleInput",
      Self::Extent => "ParameterExtent",
      Self::Crs => "ParameterCrs",
      Self::File { .. } => "ParameterFile",
    }
  }

  /// Keyword used when declaring the parameter in a script header.
  pub fn script_keyword(&self) -> &'static str {
    match self {
      Self::Number { .. } => "number",
      Self::String { multiline: true } => "longstring",
      Self::String { multiline: false } => "string",
      Self::Boolean => "boolean",
      Self::Selection { .. } => "selection",
      Self::Vector => "vector",
      Self::Raster => "raster",
      Self::Table => "table",
      Self::TableField { .. } => "field",
      Self::MultipleInput => "multiple vector",
      Self::Extent => "extent",
      Self::Crs => "crs",
      Self::File { is_folder: true } => "folder",
      Self::File { is_folder: false } => "file",
    }
  }

  /// Whether the parameter refers to a data object (layer, table or file).
  ///
  /// Paths for data objects are accepted even if they do not exist yet.
  pub fn is_data_object(&self) -> bool {
    matches!(
      self,
      Self::Vector | Self::Raster | Self::Table | Self::MultipleInput | Self::File { .. }
    )
  }
}

impl ParameterDef {
  pub fn new(name: impl Into<String>, description: impl Into<String>, kind: ParameterKind) -> Self {
    Self {
      name: name.into(),
      description: description.into(),
      kind,
      default: None,
      optional: false,
    }
  }

  /// A floating point number parameter without range limits.
  pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self::new(
      name,
      description,
      ParameterKind::Number {
        min: None,
        max: None,
        is_integer: false,
      },
    )
  }

  pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self::new(name, description, ParameterKind::String { multiline: false })
  }

  pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self::new(name, description, ParameterKind::Boolean)
  }

  pub fn vector(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self::new(name, description, ParameterKind::Vector)
  }

  pub fn with_default(mut self, default: impl Into<Value>) -> Self {
    self.default = Some(default.into());
    self
  }

  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  /// Restrict a number parameter to `[min, max]`. No-op for other kinds.
  pub fn with_range(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
    if let ParameterKind::Number { min, max, .. } = &mut self.kind {
      *min = lower;
      *max = upper;
    }
    self
  }

  /// Header line declaring this parameter in a script listing.
  ///
  /// Example: `##radius=number 5`
  pub fn script_code(&self) -> String {
    let mut code = format!("##{}={}", self.name, self.kind.script_keyword());
    if self.optional {
      code = format!("##{}=optional {}", self.name, self.kind.script_keyword());
    }
    match &self.kind {
      ParameterKind::Selection { options } => {
        code.push(' ');
        code.push_str(&options.join(";"));
      }
      ParameterKind::TableField { parent } if !parent.is_empty() => {
        code.push(' ');
        code.push_str(parent);
      }
      _ => {
        if let Some(default) = self.default.as_ref().filter(|d| !is_empty(d)) {
          code.push(' ');
          code.push_str(&display_value(default));
        }
      }
    }
    code
  }

  /// Validate and normalize a raw value for this parameter.
  ///
  /// Empty values (`null` or `""`) fall back to the default, then to `null`
  /// for optional parameters. Everything else is coerced according to the
  /// parameter kind; a value the kind cannot accept is an error.
  pub fn set_value(&self, raw: &Value) -> Result<Value, ParameterError> {
    if is_empty(raw) {
      if let Some(default) = self.default.as_ref().filter(|d| !is_empty(d)) {
        return self.normalize(default);
      }
      if self.optional {
        return Ok(Value::Null);
      }
      return Err(self.invalid(raw, "a value is required"));
    }
    self.normalize(raw)
  }

  fn normalize(&self, raw: &Value) -> Result<Value, ParameterError> {
    match &self.kind {
      ParameterKind::Number {
        min,
        max,
        is_integer,
      } => {
        let n = match raw {
          Value::Number(n) => n.as_f64(),
          Value::String(s) => s.trim().parse::<f64>().ok(),
          _ => None,
        }
        .filter(|n| n.is_finite())
        .ok_or_else(|| self.invalid(raw, "expected a number"))?;

        if *is_integer && n.fract() != 0.0 {
          return Err(self.invalid(raw, "expected an integer"));
        }
        if let Some(min) = min
          && n < *min
        {
          return Err(self.invalid(raw, &format!("value is below the minimum {}", min)));
        }
        if let Some(max) = max
          && n > *max
        {
          return Err(self.invalid(raw, &format!("value is above the maximum {}", max)));
        }

        if *is_integer {
          Ok(Value::from(n as i64))
        } else {
          serde_json::Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| self.invalid(raw, "expected a number"))
        }
      }

      ParameterKind::Boolean => match raw {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
          "true" => Ok(Value::Bool(true)),
          "false" => Ok(Value::Bool(false)),
          _ => Err(self.invalid(raw, "expected a boolean")),
        },
        _ => Err(self.invalid(raw, "expected a boolean")),
      },

      ParameterKind::Selection { options } => {
        let index = match raw {
          Value::Number(n) => n.as_u64().map(|i| i as usize),
          Value::String(s) => s
            .trim()
            .parse::<usize>()
            .ok()
            .or_else(|| options.iter().position(|o| o == s)),
          _ => None,
        };
        match index {
          Some(i) if i < options.len() => Ok(Value::from(i)),
          _ => Err(self.invalid(raw, "not one of the available options")),
        }
      }

      ParameterKind::MultipleInput => match raw {
        Value::Array(items) => Ok(Value::Array(
          items
            .iter()
            .filter(|v| !is_empty(v))
            .map(|v| Value::String(display_value(v)))
            .collect(),
        )),
        Value::String(s) => Ok(Value::Array(
          s.split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
        )),
        _ => Err(self.invalid(raw, "expected a list of layers")),
      },

      ParameterKind::String { .. } => match raw {
        Value::String(_) => Ok(raw.clone()),
        other => Ok(Value::String(display_value(other))),
      },

      ParameterKind::Vector
      | ParameterKind::Raster
      | ParameterKind::Table
      | ParameterKind::TableField { .. }
      | ParameterKind::Extent
      | ParameterKind::Crs
      | ParameterKind::File { .. } => match raw {
        Value::String(_) => Ok(raw.clone()),
        Value::Number(_) | Value::Bool(_) => Ok(Value::String(display_value(raw))),
        _ => Err(self.invalid(raw, "expected a single text value")),
      },
    }
  }

  fn invalid(&self, raw: &Value, message: &str) -> ParameterError {
    ParameterError::InvalidValue {
      name: self.name.clone(),
      kind: self.kind.class_name().to_string(),
      value: raw.to_string(),
      message: message.to_string(),
    }
  }
}

/// Render a value as plain text: strings without quotes, `null` as empty.
pub fn display_value(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(";"),
    other => other.to_string(),
  }
}

fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.is_empty(),
    _ => false,
  }
}
