//! Emotion-model conversion stage.
//!
//! When a request asks for an `emotion-model`, every emotion set produced
//! in another model is handed to the first active conversion plugin that
//! can map it. The `conversion` parameter decides what the caller sees:
//!
//! - `full`: originals and converted sets side by side, each converted set
//!   pointing at its source through `prov:wasDerivedFrom`
//! - `filtered`: only converted sets
//! - `nested`: only converted sets, each embedding its source under
//!   `prov:wasDerivedFrom`

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use sentir_core::{Activity, Error, FieldError, Params, Record, Result};
use sentir_plugins::Plugin;

const SETS_KEY: &str = "onyx:hasEmotionSet";
const MODEL_KEY: &str = "onyx:usesEmotionModel";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    Full,
    Filtered,
    Nested,
}

impl ConversionMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Some(ConversionMode::Full),
            "filtered" => Some(ConversionMode::Filtered),
            "nested" => Some(ConversionMode::Nested),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionMode::Full => "full",
            ConversionMode::Filtered => "filtered",
            ConversionMode::Nested => "nested",
        }
    }
}

fn no_converter(from: Option<&str>, to: &str) -> Error {
    let message = format!(
        "No conversion plugin found for: {} -> {}",
        from.unwrap_or("<unknown>"),
        to
    );
    Error::Validation {
        errors: vec![FieldError::new("emotion-model", message.clone())],
        message,
        parameters: None,
    }
}

/// Converts the emotion sets of `entries` to `to_model`.
///
/// Sets without `onyx:usesEmotionModel` are assumed to be in
/// `default_from` (the model declared by the plugin that produced them).
/// Returns one `analysis` record per conversion plugin that ran.
pub fn convert_entries(
    entries: &mut [Record],
    converters: &[Arc<Plugin>],
    to_model: &str,
    default_from: Option<&str>,
    mode: ConversionMode,
) -> Result<Vec<Record>> {
    let mut activities: Vec<Activity> = Vec::new();

    for entry in entries.iter_mut() {
        let sets: Vec<Record> = entry.records(SETS_KEY).into_iter().cloned().collect();
        if sets.is_empty() {
            continue;
        }

        let mut kept = Vec::with_capacity(sets.len() * 2);
        for mut original in sets {
            let from = original
                .get_str(MODEL_KEY)
                .map(str::to_string)
                .or_else(|| default_from.map(str::to_string));
            if from.as_deref() == Some(to_model) {
                kept.push(original);
                continue;
            }

            let (plugin, from) = pick_converter(converters, from.as_deref(), to_model)?;
            let converter = plugin
                .behavior()
                .converter()
                .ok_or_else(|| no_converter(Some(&from), to_model))?;
            let mut converted = converter.convert(&original, &from, to_model).map_err(|e| {
                if e.is_declared() {
                    e
                } else {
                    Error::Internal(format!("conversion by '{}' failed", plugin.name()))
                }
            })?;
            debug!(plugin = %plugin.name(), from = %from, to = %to_model, "Converted emotion set");

            let activity_id = activity_for(&mut activities, &plugin, to_model, mode);
            converted.set("prov:wasGeneratedBy", activity_id);
            match mode {
                ConversionMode::Full => {
                    converted.set("prov:wasDerivedFrom", original.id());
                    kept.push(original);
                    kept.push(converted);
                }
                ConversionMode::Filtered => kept.push(converted),
                ConversionMode::Nested => {
                    converted.set("prov:wasDerivedFrom", original);
                    kept.push(converted);
                }
            }
        }
        entry.set(SETS_KEY, kept);
    }

    Ok(activities
        .into_iter()
        .map(|mut activity| {
            activity.mark_ended();
            activity.into_record()
        })
        .collect())
}

/// First converter able to map `from` to `to`, with the concrete source
/// model it will convert from.
fn pick_converter(
    converters: &[Arc<Plugin>],
    from: Option<&str>,
    to: &str,
) -> Result<(Arc<Plugin>, String)> {
    for plugin in converters {
        let Some(converter) = plugin.behavior().converter() else {
            continue;
        };
        if !converter.can_convert(from, to) {
            continue;
        }
        let source = match from {
            Some(from) => from.to_string(),
            None => match converter.conversions().into_iter().find(|(_, t)| t == to) {
                Some((f, _)) => f,
                None => continue,
            },
        };
        return Ok((plugin.clone(), source));
    }
    Err(no_converter(from, to))
}

fn activity_for(
    activities: &mut Vec<Activity>,
    plugin: &Plugin,
    to_model: &str,
    mode: ConversionMode,
) -> String {
    if let Some(existing) = activities.iter().find(|a| a.plugin() == plugin.name()) {
        return existing.id().to_string();
    }
    let mut params = Params::new();
    params.insert("emotion-model".into(), json!(to_model));
    params.insert("conversion".into(), json!(mode.as_str()));
    let mut activity = Activity::new(plugin.name(), &plugin.id(), params);
    activity.mark_started();
    let id = activity.id().to_string();
    activities.push(activity);
    id
}
