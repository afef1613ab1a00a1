//! Modeler Catalog
//!
//! This crate defines the contract every algorithm fulfils ([`Algorithm`]),
//! the lookup capability the model runtime is given ([`Catalog`]) and the
//! feedback sink algorithms report progress to ([`Feedback`]).
//!
//! Two catalogues are provided:
//! - [`MemoryCatalog`]: algorithms registered in code.
//! - [`FsCatalog`]: template algorithms loaded from JSON descriptors on disk.
//!
//! Catalogues are passed explicitly to whoever needs them; there is no
//! process-wide registry.

mod algorithm;
mod catalog;
mod error;
mod feedback;
mod fs_catalog;
mod template;

pub use algorithm::{Algorithm, AlgorithmError, ValueMap};
pub use catalog::{Catalog, MemoryCatalog};
pub use error::CatalogError;
pub use feedback::{ChannelFeedback, Feedback, FeedbackEvent, NoopFeedback, TracingFeedback};
pub use fs_catalog::FsCatalog;
pub use template::{AlgorithmDescriptor, TemplateAlgorithm, TemplateOutput};

pub use modeler_parameters::{OutputDef, OutputKind, ParameterDef, ParameterKind};
