//! Modeler Runtime
//!
//! This crate runs models. The [`Executor`] validates a [`ModelGraph`]
//! against a catalogue, computes the execution order, resolves every bound
//! value and runs the nodes one by one, collecting the exposed outputs.
//!
//! Models can also be packaged as algorithms ([`ModelAlgorithm`]) and loaded
//! from disk on top of another catalogue ([`ModelCatalog`]), which is how
//! models nest.
//!
//! [`ModelGraph`]: modeler_model::ModelGraph

mod error;
mod executor;
mod model_algorithm;
mod model_catalog;
mod resolve;
mod result;

pub use error::RuntimeError;
pub use executor::Executor;
pub use model_algorithm::ModelAlgorithm;
pub use model_catalog::ModelCatalog;
pub use resolve::{normalize_inputs, resolve_value};
pub use result::{ExecutionResult, NodeResult};
