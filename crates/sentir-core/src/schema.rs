//! Compiled JSON Schema documents attached to record kinds.
//!
//! Schemas are compiled once when a kind is built and shared read-only
//! afterwards. Validation collects every violation instead of stopping at
//! the first one.

use std::fmt;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value as JsonValue;

use crate::error::{Error, FieldError, Result};

/// A Draft 7 schema compiled for repeated validation.
pub struct CompiledSchema {
    source: JsonValue,
    compiled: JSONSchema,
}

impl CompiledSchema {
    /// Compiles `schema`. A malformed document is a configuration error.
    pub fn compile(schema: JsonValue) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| Error::Configuration(format!("Failed to compile schema: {}", e)))?;
        Ok(Self {
            source: schema,
            compiled,
        })
    }

    /// The schema document as written.
    pub fn source(&self) -> &JsonValue {
        &self.source
    }

    /// Validates `instance`, returning every violation found.
    pub fn validate(&self, instance: &JsonValue) -> std::result::Result<(), Vec<FieldError>> {
        match self.compiled.validate(instance) {
            Ok(()) => Ok(()),
            Err(errors) => Err(errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    let field = if path.is_empty() { "/".to_string() } else { path };
                    FieldError::new(field, e.to_string())
                })
                .collect()),
        }
    }

    /// `default` values declared on top-level properties, in property order.
    ///
    /// Properties declared inside `allOf` members are included as well so a
    /// schema that extends another still contributes its inherited defaults.
    pub fn property_defaults(&self) -> Vec<(String, JsonValue)> {
        let mut out = Vec::new();
        collect_defaults(&self.source, &mut out);
        out
    }
}

fn collect_defaults(schema: &JsonValue, out: &mut Vec<(String, JsonValue)>) {
    if let Some(all_of) = schema.get("allOf").and_then(JsonValue::as_array) {
        for part in all_of {
            collect_defaults(part, out);
        }
    }
    if let Some(props) = schema.get("properties").and_then(JsonValue::as_object) {
        for (key, prop) in props {
            if let Some(default) = prop.get("default") {
                if let Some(slot) = out.iter_mut().find(|(k, _)| k == key) {
                    slot.1 = default.clone();
                } else {
                    out.push((key.clone(), default.clone()));
                }
            }
        }
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self
            .source
            .get("title")
            .and_then(JsonValue::as_str)
            .unwrap_or("<untitled>");
        f.debug_struct("CompiledSchema").field("title", &title).finish()
    }
}
