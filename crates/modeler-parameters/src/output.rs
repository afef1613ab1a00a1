use serde::{Deserialize, Serialize};

/// Definition of a single output produced by an algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDef {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(flatten)]
  pub kind: OutputKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputKind {
  #[serde(rename = "OutputVector")]
  Vector,
  #[serde(rename = "OutputRaster")]
  Raster,
  #[serde(rename = "OutputTable")]
  Table,
  #[serde(rename = "OutputHTML")]
  Html,
  #[serde(rename = "OutputFile")]
  File,
  #[serde(rename = "OutputDirectory")]
  Directory,
  #[serde(rename = "OutputNumber")]
  Number,
  #[serde(rename = "OutputString")]
  String,
  #[serde(rename = "OutputExtent")]
  Extent,
  #[serde(rename = "OutputCrs")]
  Crs,
}

impl OutputKind {
  /// Keyword used when declaring the output in a script header.
  pub fn script_keyword(&self) -> &'static str {
    match self {
      Self::Vector => "output vector",
      Self::Raster => "output raster",
      Self::Table => "output table",
      Self::Html => "output html",
      Self::File => "output file",
      Self::Directory => "output directory",
      Self::Number => "output number",
      Self::String => "output string",
      Self::Extent => "output extent",
      Self::Crs => "output crs",
    }
  }
}

impl OutputDef {
  pub fn new(name: impl Into<String>, description: impl Into<String>, kind: OutputKind) -> Self {
    Self {
      name: name.into(),
      description: description.into(),
      kind,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_output_type_tag() {
    let out = OutputDef::new("OUTPUT", "Buffered", OutputKind::Vector);
    let value = serde_json::to_value(&out).unwrap();
    assert_eq!(value["type"], "OutputVector");
    assert_eq!(out.kind.script_keyword(), "output vector");
  }
}
