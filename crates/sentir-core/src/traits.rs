//! Core traits for sentir plugins.
//!
//! These traits define what the runtime needs from a plugin implementation
//! and from the private store each plugin instance owns.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models;
use crate::params::{ParamSpecs, Params};
use crate::record::Record;

// =============================================================================
// PLUGIN BEHAVIOR
// =============================================================================

/// The analysis logic behind a registered plugin.
///
/// The runtime calls [`activate`](PluginBehavior::activate) at most once per
/// transition, never concurrently for the same plugin. Analysis calls may run
/// concurrently with each other; state shared between them belongs in the
/// plugin store reached through [`PluginContext::with_store`].
#[async_trait]
pub trait PluginBehavior: Send + Sync {
    /// One-time setup such as loading a lexicon.
    async fn activate(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// Release whatever `activate` acquired.
    async fn deactivate(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// Analyse one entry, producing zero or more entries.
    ///
    /// Any parallel work started here must finish before returning.
    async fn analyse_entry(
        &self,
        entry: Record,
        activity: &Activity,
        ctx: &PluginContext,
    ) -> Result<Vec<Record>>;

    /// Parameters the behavior always accepts. Descriptor `extra_params`
    /// with the same name take precedence.
    fn extra_params(&self) -> ParamSpecs {
        ParamSpecs::new()
    }

    /// Emotion-model conversion, for conversion plugins.
    fn converter(&self) -> Option<&dyn EmotionConverter> {
        None
    }

    /// Whether a post-processing plugin should run for these parameters.
    fn applies_to(&self, _params: &Params) -> bool {
        false
    }
}

/// Bidirectional mapping between emotion models.
pub trait EmotionConverter: Send + Sync {
    /// Supported `(from, to)` model pairs.
    fn conversions(&self) -> Vec<(String, String)>;

    fn can_convert(&self, from: Option<&str>, to: &str) -> bool {
        self.conversions()
            .iter()
            .any(|(f, t)| t == to && from.map_or(true, |from| from == f))
    }

    /// Converts one emotion set from model `from` to model `to`.
    fn convert(&self, set: &Record, from: &str, to: &str) -> Result<Record>;
}

// =============================================================================
// ACTIVITY
// =============================================================================

/// One plugin invocation: the resolved parameters plus the `analysis`
/// provenance record that ends up in the response.
#[derive(Debug, Clone)]
pub struct Activity {
    plugin: String,
    params: Params,
    record: Record,
}

impl Activity {
    pub fn new(plugin: &str, plugin_id: &str, params: Params) -> Self {
        let mut record = models::analysis(plugin_id);
        record.id();
        for (name, value) in &params {
            record.push("prov:used", models::parameter(name, value.clone()));
        }
        Self {
            plugin: plugin.to_string(),
            params,
            record,
        }
    }

    pub fn id(&self) -> &str {
        self.record.id_ref().unwrap_or_default()
    }

    /// Name of the plugin this activity runs.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&JsonValue> {
        self.params.get(key)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(JsonValue::as_str)
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(JsonValue::as_f64)
    }

    pub fn param_bool(&self, key: &str) -> bool {
        self.params
            .get(key)
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn mark_started(&mut self) {
        self.record.set("prov:startedAtTime", Utc::now().to_rfc3339());
    }

    pub fn mark_ended(&mut self) {
        self.record.set("prov:endedAtTime", Utc::now().to_rfc3339());
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}

// =============================================================================
// PLUGIN STORE
// =============================================================================

/// Private key/value store owned by one plugin instance.
pub trait StateStore: Send {
    fn get(&mut self, key: &str) -> Result<Option<JsonValue>>;
    fn set(&mut self, key: &str, value: JsonValue) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<Option<JsonValue>>;
    fn keys(&mut self) -> Result<Vec<String>>;
    /// Persist pending changes.
    fn flush(&mut self) -> Result<()>;
}

/// Store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, JsonValue>,
}

impl StateStore for MemoryStore {
    fn get(&mut self, key: &str) -> Result<Option<JsonValue>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: JsonValue) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<Option<JsonValue>> {
        Ok(self.entries.remove(key))
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// PLUGIN CONTEXT
// =============================================================================

/// Runtime handles passed to every behavior call.
#[derive(Clone)]
pub struct PluginContext {
    name: String,
    data_folder: PathBuf,
    store: Arc<Mutex<Box<dyn StateStore>>>,
}

impl PluginContext {
    pub fn new(
        name: impl Into<String>,
        data_folder: impl Into<PathBuf>,
        store: Box<dyn StateStore>,
    ) -> Self {
        Self {
            name: name.into(),
            data_folder: data_folder.into(),
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Context backed by a [`MemoryStore`].
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(name, std::env::temp_dir(), Box::new(MemoryStore::default()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }

    /// Runs `f` with exclusive access to the plugin store.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn StateStore) -> Result<T> + Send,
    {
        let mut store = self.store.lock().await;
        f(store.as_mut())
    }

    pub async fn flush(&self) -> Result<()> {
        self.store.lock().await.flush()
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("name", &self.name)
            .field("data_folder", &self.data_folder)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl PluginBehavior for Echo {
        async fn analyse_entry(
            &self,
            entry: Record,
            _activity: &Activity,
            ctx: &PluginContext,
        ) -> Result<Vec<Record>> {
            ctx.with_store(|store| {
                let seen = store.get("seen")?.and_then(|v| v.as_u64()).unwrap_or(0);
                store.set("seen", json!(seen + 1))
            })
            .await?;
            Ok(vec![entry])
        }
    }

    #[tokio::test]
    async fn test_behavior_defaults_and_store_access() {
        let ctx = PluginContext::in_memory("echo");
        let plugin = Echo;
        plugin.activate(&ctx).await.unwrap();
        assert!(plugin.converter().is_none());

        let activity = Activity::new("echo", "endpoint:plugins/echo_1", Params::new());
        for _ in 0..3 {
            let out = plugin
                .analyse_entry(models::entry("hi"), &activity, &ctx)
                .await
                .unwrap();
            assert_eq!(out.len(), 1);
        }

        let seen = ctx.with_store(|s| s.get("seen")).await.unwrap();
        assert_eq!(seen, Some(json!(3)));
    }

    #[test]
    fn test_activity_records_parameters() {
        let mut params = Params::new();
        params.insert("language".into(), json!("en"));
        let mut activity = Activity::new("echo", "endpoint:plugins/echo_1", params);
        activity.mark_started();
        activity.mark_ended();

        assert!(activity.id().starts_with("prefix:analysis_"));
        assert_eq!(activity.param_str("language"), Some("en"));
        let record = activity.into_record();
        assert_eq!(record.records("parameters").len(), 1);
        assert_eq!(
            record.get_str("algorithm"),
            Some("endpoint:plugins/echo_1")
        );
        assert!(record.contains("prov:endedAtTime"));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::default();
        store.set("a", json!(1)).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a".to_string()]);
        assert_eq!(store.delete("a").unwrap(), Some(json!(1)));
        assert_eq!(store.get("a").unwrap(), None);
    }
}
