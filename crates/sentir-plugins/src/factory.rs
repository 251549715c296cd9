//! Plugin factory.
//!
//! Maps a descriptor's `module` key to the constructor of its behavior.
//! The built-in plugins are pre-registered by [`PluginFactory::with_builtins`];
//! embedders add their own with [`PluginFactory::register`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use sentir_core::{Capability, Error, PluginBehavior, Result};

use crate::builtin;
use crate::descriptor::PluginDescriptor;

type Constructor = dyn Fn(&PluginDescriptor) -> Result<Arc<dyn PluginBehavior>> + Send + Sync;

struct FactoryEntry {
    capability: Capability,
    build: Arc<Constructor>,
}

/// Registry of behavior constructors keyed by module name.
#[derive(Default)]
pub struct PluginFactory {
    entries: HashMap<String, FactoryEntry>,
}

impl PluginFactory {
    /// Empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with the bundled plugins registered.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        builtin::register_all(&mut factory);
        factory
    }

    /// Register a constructor. The capability is used when the descriptor
    /// does not declare one. A later registration replaces an earlier one.
    pub fn register<F>(&mut self, key: impl Into<String>, capability: Capability, build: F)
    where
        F: Fn(&PluginDescriptor) -> Result<Arc<dyn PluginBehavior>> + Send + Sync + 'static,
    {
        let key = key.into();
        debug!(module = %key, capability = %capability, "Registering plugin module");
        self.entries.insert(
            key,
            FactoryEntry {
                capability,
                build: Arc::new(build),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered module names, sorted.
    pub fn modules(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Builds the behavior for `descriptor`, returning the capability it
    /// runs with.
    pub fn build(&self, descriptor: &PluginDescriptor) -> Result<(Capability, Arc<dyn PluginBehavior>)> {
        let key = descriptor.factory_key();
        let entry = self.entries.get(key).ok_or_else(|| {
            Error::InvalidDescriptor(format!(
                "plugin '{}': unknown module '{}'",
                descriptor.name, key
            ))
        })?;
        let capability = descriptor.capability.unwrap_or(entry.capability);
        let behavior = (entry.build)(descriptor)?;
        Ok((capability, behavior))
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginFactory")
            .field("modules", &self.modules())
            .finish()
    }
}
