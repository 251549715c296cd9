//! Declarative plugin descriptors.
//!
//! A descriptor is a YAML document (`*.plugin.yaml`, `*.plugin.yml` or the
//! legacy `*.senpy`) naming a plugin, its version, the factory `module` that
//! builds its behavior, and any extra keys the behavior reads:
//!
//! ```yaml
//! name: split
//! version: "0.3"
//! module: split
//! capability: transformation
//! description: Split entries into sentences
//! extra_params:
//!   delimiter:
//!     aliases: [type, t]
//!     required: true
//!     default: sentence
//!     options: [sentence, paragraph]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use sentir_core::defaults::PLUGIN_ID_PREFIX;
use sentir_core::{Capability, Error, ParamSpec, ParamSpecs, Result};

/// Parsed plugin descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub version: String,
    /// Factory key; defaults to the plugin name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub extra_params: ParamSpecs,
    /// Free-form keys handed to the factory and kept on the plugin record.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
    /// File the descriptor was read from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            module: None,
            capability: None,
            description: None,
            author: None,
            url: None,
            requirements: Vec::new(),
            extra_params: ParamSpecs::new(),
            extra: Map::new(),
            source: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.extra_params.insert(name.into(), spec);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Parses a YAML descriptor. `source` is only used for diagnostics.
    pub fn from_yaml(text: &str, source: Option<&Path>) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(text).map_err(|e| {
            Error::InvalidDescriptor(format!("{}: {}", display_source(source), e))
        })?;
        Self::from_value(value, source)
    }

    /// Builds a descriptor from plain JSON, checking identity fields first.
    pub fn from_value(value: JsonValue, source: Option<&Path>) -> Result<Self> {
        let JsonValue::Object(mut map) = value else {
            return Err(Error::InvalidDescriptor(format!(
                "{}: descriptor must be a mapping",
                display_source(source)
            )));
        };

        let mut missing = Vec::new();
        match map.get("name") {
            Some(JsonValue::String(s)) if !s.trim().is_empty() => {}
            _ => missing.push("name"),
        }
        match map.get("version").cloned() {
            Some(JsonValue::String(s)) if !s.trim().is_empty() => {}
            Some(JsonValue::Number(n)) => {
                map.insert("version".into(), JsonValue::String(n.to_string()));
            }
            _ => missing.push("version"),
        }
        if !missing.is_empty() {
            return Err(Error::InvalidDescriptor(format!(
                "{}: missing {}",
                display_source(source),
                missing.join(" and ")
            )));
        }

        let mut descriptor: PluginDescriptor = serde_json::from_value(JsonValue::Object(map))
            .map_err(|e| {
                Error::InvalidDescriptor(format!("{}: {}", display_source(source), e))
            })?;
        descriptor.source = source.map(Path::to_path_buf);
        Ok(descriptor)
    }

    /// Key used to look up the behavior factory.
    pub fn factory_key(&self) -> &str {
        self.module.as_deref().unwrap_or(&self.name)
    }

    /// Stable plugin identifier: `endpoint:plugins/{name}_{version}`.
    pub fn id(&self) -> String {
        format!("{}{}_{}", PLUGIN_ID_PREFIX, self.name, self.version)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.extra.get(key)
    }
}

fn display_source(source: Option<&Path>) -> String {
    source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<inline>".to_string())
}

/// Whether `path` names a descriptor file.
pub fn is_descriptor_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    sentir_core::defaults::DESCRIPTOR_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}
