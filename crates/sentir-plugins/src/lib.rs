//! # sentir-plugins
//!
//! Plugin runtime for sentir.
//!
//! This crate provides:
//! - YAML plugin descriptors and folder discovery
//! - A factory mapping descriptor `module` keys to plugin behaviors
//! - The [`PluginRegistry`] lifecycle state machine with broadcast events
//! - Requirement installation before activation
//! - A crash-safe per-plugin key/value store
//! - The bundled plugins (splitter, centroid conversion, max emotion, random
//!   annotators)

pub mod builtin;
pub mod descriptor;
pub mod discovery;
pub mod factory;
pub mod installer;
pub mod plugin;
pub mod registry;
pub mod store;

pub use descriptor::PluginDescriptor;
pub use discovery::{discover, DiscoveryFailure, DiscoveryReport};
pub use factory::PluginFactory;
pub use installer::{CommandInstaller, DependencyInstaller, NoopInstaller};
pub use plugin::Plugin;
pub use registry::{
    LoadReport, PluginRegistry, PluginSnapshot, PluginState, RegistryConfig, RegistryEvent,
    Transition,
};
pub use store::{FileStore, StoreRecovery};
