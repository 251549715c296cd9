//! # sentir-core
//!
//! Core types and traits for the sentir analysis runtime.
//!
//! This crate provides the schema-backed record model every document is
//! built from, the parameter resolver, the error taxonomy and the traits a
//! plugin implements. The plugin registry, the orchestrator and the HTTP
//! transport all build on it.

pub mod capability;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod params;
pub mod record;
pub mod schema;
pub mod traits;

// Re-export commonly used types at crate root
pub use capability::Capability;
pub use error::{Error, FieldError, Result};
pub use params::{ParamSpec, ParamSpecs, Params, Processor};
pub use record::{Field, FieldAlias, KindRegistry, Record, RecordKind, RecordKindBuilder};
pub use schema::CompiledSchema;
pub use traits::{
    Activity, EmotionConverter, MemoryStore, PluginBehavior, PluginContext, StateStore,
};
