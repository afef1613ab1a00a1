//! Modeler Parameters
//!
//! This crate contains the typed parameter and output definitions shared by
//! algorithms, the model graph and the runtime. A [`ParameterDef`] describes
//! one input of an algorithm and owns the normalization hook
//! ([`ParameterDef::set_value`]) that turns a raw resolved value into the
//! value the algorithm actually receives.
//!
//! Definitions serialize with a `type` discriminator so they can be embedded
//! in model files and algorithm descriptors:
//!
//! ```json
//! { "name": "DISTANCE", "description": "Distance", "type": "ParameterNumber",
//!   "minValue": 0.0, "default": 10 }
//! ```

mod error;
mod output;
mod parameter;

pub use error::ParameterError;
pub use output::{OutputDef, OutputKind};
pub use parameter::{ParameterDef, ParameterKind, display_value};
