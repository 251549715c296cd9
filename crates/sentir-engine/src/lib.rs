//! # sentir-engine
//!
//! Analysis orchestration for sentir.
//!
//! This crate provides:
//! - The [`Engine`]: parameter resolution, plugin selection, linear chain
//!   execution under a per-call deadline, result assembly and validation
//! - The emotion-model conversion stage
//! - The response serializer (context inclusion, framing, compaction)
//! - Engine configuration from environment variables

pub mod config;
pub mod conversion;
pub mod orchestrator;
pub mod serializer;

pub use config::EngineConfig;
pub use conversion::{convert_entries, ConversionMode};
pub use orchestrator::Engine;
pub use serializer::{
    parse, parse_with_context, render, render_error, RenderOptions, Rendered, JSONLD_CONTENT_TYPE,
};
