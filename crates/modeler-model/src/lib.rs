//! Modeler Model
//!
//! This crate provides the model graph: a composite algorithm built from
//! other algorithms. A [`ModelGraph`] owns its inputs and nodes; every node
//! binds the parameters of its algorithm to [`ValueExpression`]s, and the
//! `FromOutput` bindings are what connects nodes into a DAG.
//!
//! The graph answers the structural questions the runtime and editors need:
//! - Dependency analysis (`depends_on`, `dependents`, `has_dependencies`)
//! - Execution order (`schedule`), with cycle and unmet dependency detection
//! - Activation with downstream propagation and deletion guards
//! - The textual model format and a script-like source listing
//!
//! Running a model lives in `modeler-runtime`.

mod error;
mod format;
mod graph;
mod listing;
mod node;
mod point;
mod value;

pub use error::ModelError;
pub use graph::{BOX_HEIGHT, BOX_WIDTH, ModelGraph, safe_output_name};
pub use listing::safe_name;
pub use node::{ModelInput, ModelNode, ModelOutput};
pub use point::Point;
pub use value::ValueExpression;
