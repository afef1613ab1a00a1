use serde::{Deserialize, Serialize};

/// A position on the model canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  pub fn offset(&self, dx: f64, dy: f64) -> Self {
    Self::new(self.x + dx, self.y + dy)
  }
}
