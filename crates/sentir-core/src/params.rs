//! Parameter specifications and the resolver that applies them.
//!
//! A [`ParamSpec`] declares one parameter: accepted aliases, whether it is
//! required, a default, an optional closed set of options and an optional
//! value processor. [`resolve`] merges a raw parameter map against a set of
//! specs and either returns the clean map or one aggregated validation error
//! listing every bad or missing parameter.
//!
//! ## Alias precedence
//!
//! For each declared parameter the canonical name is looked up first, then
//! each alias in declared order; the first hit wins. Every alias key found is
//! removed from the output, so resolving the output again is a no-op.
//!
//! ## Boolean options
//!
//! A spec whose options are exactly `[true, false]` coerces its value:
//! `"true"`, `"1"` and `""` (case-insensitive) become `true`, anything else
//! becomes `false`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::error::{Error, FieldError, Result};

/// Raw or resolved parameter map.
pub type Params = Map<String, JsonValue>;

/// Specs keyed by canonical parameter name, iterated in name order.
pub type ParamSpecs = BTreeMap<String, ParamSpec>;

/// Transformation applied to a supplied value before option checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Processor {
    /// `"a,b"` becomes `["a", "b"]`; lists pass through.
    #[serde(alias = "string_to_tuple")]
    StringToList,
}

impl Processor {
    pub fn apply(&self, value: JsonValue) -> JsonValue {
        match self {
            Processor::StringToList => match value {
                JsonValue::String(s) => JsonValue::Array(
                    s.split(',')
                        .map(|part| JsonValue::String(part.trim().to_string()))
                        .collect(),
                ),
                other => other,
            },
        }
    }
}

/// Declaration of a single parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<Processor>,
    #[serde(default, alias = "help", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ParamSpec {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn optional() -> Self {
        Self::default()
    }

    /// Boolean flag defaulting to `default`.
    pub fn boolean(default: bool) -> Self {
        Self::required()
            .with_default(JsonValue::Bool(default))
            .with_options(vec![JsonValue::Bool(true), JsonValue::Bool(false)])
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_options(mut self, options: Vec<JsonValue>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_processor(mut self, processor: Processor) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// True when the option set is exactly `{true, false}`.
    pub fn is_boolean(&self) -> bool {
        match &self.options {
            Some(options) => {
                options.len() == 2
                    && options.contains(&JsonValue::Bool(true))
                    && options.contains(&JsonValue::Bool(false))
            }
            None => false,
        }
    }

    fn as_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

fn coerce_bool(value: &JsonValue) -> bool {
    let text = match value {
        JsonValue::Bool(b) => return *b,
        JsonValue::String(s) => s.to_lowercase(),
        other => other.to_string(),
    };
    matches!(text.as_str(), "true" | "1" | "")
}

/// Resolves `raw` against `specs`, collecting every failure.
///
/// Keys that no spec mentions pass through untouched.
pub fn resolve(raw: &Params, specs: &ParamSpecs) -> Result<Params> {
    let mut out = raw.clone();
    let mut errors = Vec::new();

    for (name, spec) in specs {
        let mut value = out.remove(name);
        for alias in &spec.aliases {
            if alias == name {
                continue;
            }
            if let Some(found) = out.remove(alias) {
                if value.is_none() {
                    value = Some(found);
                }
            }
        }

        let Some(mut value) = value else {
            if let Some(default) = &spec.default {
                out.insert(name.clone(), default.clone());
            } else if spec.required {
                errors.push(
                    FieldError::new(name.clone(), "missing required parameter")
                        .with_spec(spec.as_json()),
                );
            }
            continue;
        };

        if let Some(processor) = spec.processor {
            value = processor.apply(value);
        }
        if let Some(options) = &spec.options {
            if spec.is_boolean() {
                value = JsonValue::Bool(coerce_bool(&value));
            } else if !options.contains(&value) {
                errors.push(
                    FieldError::new(name.clone(), format!("invalid value {}", value))
                        .with_spec(spec.as_json()),
                );
            }
        }
        out.insert(name.clone(), value);
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        debug!(
            error_count = errors.len(),
            "Parameter resolution failed"
        );
        Err(Error::invalid_params(errors, Some(out)))
    }
}

/// Merges `overlay` over `base`; entries in `overlay` win on collision.
pub fn merge_specs(base: &ParamSpecs, overlay: &ParamSpecs) -> ParamSpecs {
    let mut merged = base.clone();
    for (name, spec) in overlay {
        merged.insert(name.clone(), spec.clone());
    }
    merged
}

/// Resolves against a global spec, then against a plugin's own spec using
/// the already-resolved values as input.
///
/// Global entries shadowed by a plugin entry of the same name are skipped in
/// the first pass. Failures from both passes are reported together.
pub fn resolve_layered(raw: &Params, global: &ParamSpecs, plugin: &ParamSpecs) -> Result<Params> {
    let global_only: ParamSpecs = global
        .iter()
        .filter(|(name, _)| !plugin.contains_key(*name))
        .map(|(name, spec)| (name.clone(), spec.clone()))
        .collect();

    match resolve(raw, &global_only) {
        Ok(resolved) => resolve(&resolved, plugin),
        Err(Error::Validation {
            errors: mut first,
            parameters,
            ..
        }) => {
            let partial = parameters.unwrap_or_else(|| raw.clone());
            match resolve(&partial, plugin) {
                Ok(resolved) => Err(Error::invalid_params(first, Some(resolved))),
                Err(Error::Validation {
                    errors: second,
                    parameters,
                    ..
                }) => {
                    first.extend(second);
                    Err(Error::invalid_params(first, parameters))
                }
                Err(other) => Err(other),
            }
        }
        Err(other) => Err(other),
    }
}

/// Parameters that apply to one stage of a chain.
///
/// More specific names override more general ones:
/// `<index>.param` > `<plugin>.param` > `param`.
pub fn filter_params(params: &Params, plugin: &str, index: Option<usize>) -> Params {
    let plugin_prefix = format!("{}.", plugin);
    let index_prefix = index.map(|i| format!("{}.", i));
    let is_scoped = |key: &str| {
        key.starts_with(&plugin_prefix)
            || index_prefix.as_deref().map_or(false, |p| key.starts_with(p))
    };

    let mut out: Params = params
        .iter()
        .filter(|(k, _)| !is_scoped(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (key, value) in params {
        if let Some(stripped) = key.strip_prefix(&plugin_prefix) {
            out.insert(stripped.to_string(), value.clone());
        }
    }
    if let Some(prefix) = &index_prefix {
        for (key, value) in params {
            if let Some(stripped) = key.strip_prefix(prefix.as_str()) {
                out.insert(stripped.to_string(), value.clone());
            }
        }
    }
    out
}

fn strings(values: &[&str]) -> Vec<JsonValue> {
    values.iter().map(|v| JsonValue::String(v.to_string())).collect()
}

/// Parameters describing the input document.
pub fn nif_params() -> ParamSpecs {
    let mut specs = ParamSpecs::new();
    specs.insert(
        "input".into(),
        ParamSpec::required()
            .with_aliases(&["i"])
            .with_id("input")
            .with_description("Input text"),
    );
    specs.insert(
        "intype".into(),
        ParamSpec::optional()
            .with_aliases(&["t"])
            .with_id("intype")
            .with_default("direct".into())
            .with_options(strings(&["direct", "url", "file"])),
    );
    specs.insert(
        "informat".into(),
        ParamSpec::optional()
            .with_aliases(&["f"])
            .with_id("informat")
            .with_default("text".into())
            .with_options(strings(&["text", "json-ld"])),
    );
    specs.insert(
        "language".into(),
        ParamSpec::optional().with_aliases(&["l"]).with_id("language"),
    );
    specs.insert(
        "prefix".into(),
        ParamSpec::required()
            .with_aliases(&["p"])
            .with_id("prefix")
            .with_default("".into()),
    );
    specs.insert(
        "urischeme".into(),
        ParamSpec::optional()
            .with_aliases(&["u"])
            .with_id("urischeme")
            .with_default("RFC5147String".into())
            .with_options(strings(&["RFC5147String"])),
    );
    specs
}

/// Parameters controlling dispatch and output.
pub fn api_params() -> ParamSpecs {
    let mut specs = ParamSpecs::new();
    specs.insert(
        "algorithm".into(),
        ParamSpec::optional()
            .with_aliases(&["algorithms", "a", "algo"])
            .with_processor(Processor::StringToList)
            .with_description(
                "Algorithms that will be used to process the request. \
                 It may be a list of comma-separated names.",
            ),
    );
    specs.insert(
        "expanded-jsonld".into(),
        ParamSpec::boolean(false)
            .with_aliases(&["expanded", "expanded_jsonld"])
            .with_id("expanded-jsonld")
            .with_description("use JSON-LD expansion to get full URIs"),
    );
    specs.insert(
        "with-parameters".into(),
        ParamSpec::boolean(false)
            .with_aliases(&["withparameters", "with_parameters"])
            .with_description("include initial parameters in the response"),
    );
    specs.insert(
        "outformat".into(),
        ParamSpec::required()
            .with_aliases(&["o"])
            .with_id("outformat")
            .with_default("json-ld".into())
            .with_options(strings(&["json-ld"])),
    );
    specs.insert(
        "help".into(),
        ParamSpec::boolean(false)
            .with_aliases(&["h"])
            .with_id("help"),
    );
    specs.insert(
        "verbose".into(),
        ParamSpec::boolean(false)
            .with_aliases(&["v"])
            .with_id("verbose")
            .with_description("Show all properties in the result"),
    );
    specs.insert(
        "aliases".into(),
        ParamSpec::boolean(false)
            .with_id("aliases")
            .with_description("Replace JSON properties with their aliases"),
    );
    specs.insert(
        "emotion-model".into(),
        ParamSpec::optional()
            .with_aliases(&["emoModel", "emotionModel"])
            .with_id("emotionModel")
            .with_description("Emotion model the output should be converted to"),
    );
    specs.insert(
        "conversion".into(),
        ParamSpec::required()
            .with_id("conversion")
            .with_default(crate::defaults::CONVERSION_MODE.into())
            .with_options(strings(&["filtered", "nested", "full"])),
    );
    specs
}

/// Parameters read by the HTTP transport.
pub fn web_params() -> ParamSpecs {
    let mut specs = ParamSpecs::new();
    specs.insert(
        "in-headers".into(),
        ParamSpec::boolean(false).with_aliases(&[
            "headers",
            "inheaders",
            "inHeaders",
            "in_headers",
        ]),
    );
    specs
}

/// Parameters for plugin listing.
pub fn plugins_params() -> ParamSpecs {
    let mut specs = ParamSpecs::new();
    specs.insert(
        "plugin-type".into(),
        ParamSpec::required()
            .with_aliases(&["pluginType", "plugin_type"])
            .with_id("pluginType")
            .with_default("analysisPlugin".into()),
    );
    specs
}
