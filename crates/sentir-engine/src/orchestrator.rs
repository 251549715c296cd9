//! Analysis orchestrator.
//!
//! The [`Engine`] is the surface the transport talks to. A request runs as a
//! linear chain:
//!
//! 1. Pick the plugins named by `algorithm`, or the default plugin.
//! 2. Resolve every stage's parameters (global spec, then the plugin's own
//!    `extra_params`) before any plugin code runs.
//! 3. Feed the entries through each stage in order. A stage may fan one
//!    entry out into many or rewrite annotations in place.
//! 4. Convert emotion sets when `emotion-model` is set, then run the
//!    post-processing plugins that apply to the request.
//! 5. Assemble and validate the `results` document.
//!
//! Failures never yield a partial document: plugin-declared errors pass
//! through unchanged, anything else becomes [`Error::Internal`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, trace, warn};

use sentir_core::params::{
    api_params, filter_params, merge_specs, nif_params, plugins_params, resolve,
    resolve_layered, web_params,
};
use sentir_core::{models, Activity, Capability, Error, ParamSpecs, Params, Record, Result};
use sentir_plugins::{Plugin, PluginFactory, PluginRegistry, PluginState};

use crate::config::EngineConfig;
use crate::conversion::{convert_entries, ConversionMode};

/// One resolved chain stage.
struct Stage {
    plugin: Arc<Plugin>,
    params: Params,
}

/// Dispatches analysis requests to registered plugins.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: PluginRegistry,
    config: EngineConfig,
    global: ParamSpecs,
}

impl Engine {
    /// Wraps an already populated registry.
    pub fn new(registry: PluginRegistry, config: EngineConfig) -> Self {
        let global = merge_specs(&merge_specs(&nif_params(), &api_params()), &web_params());
        Self {
            registry,
            config,
            global,
        }
    }

    /// Builds the registry from `config`, loads the plugin folders and,
    /// when configured, activates every plugin.
    pub async fn from_config(config: EngineConfig) -> Result<Self> {
        Self::start(PluginFactory::with_builtins(), config).await
    }

    /// Same as [`Engine::from_config`] with a caller-provided factory.
    pub async fn start(factory: PluginFactory, config: EngineConfig) -> Result<Self> {
        let registry = PluginRegistry::with_factory(config.registry.clone(), factory);
        let (discovery, load) = registry.load_from_folders().await?;
        for failure in &discovery.failures {
            warn!(
                descriptor = %failure.path.display(),
                error = %failure.error,
                "Skipped plugin descriptor"
            );
        }
        info!(
            plugin_count = load.registered.len(),
            failed = load.failures.len() + discovery.failures.len(),
            "Plugins loaded"
        );

        if config.registry.activate_all {
            let results = registry.activate_all().await;
            let active = results
                .iter()
                .filter(|(_, r)| matches!(r, Ok(PluginState::Active)))
                .count();
            info!(plugin_count = active, "Plugins activated");
        }
        Ok(Self::new(registry, config))
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Global parameter specification every request is resolved against.
    pub fn parameter_specs(&self) -> &ParamSpecs {
        &self.global
    }

    /// Resolves raw request parameters against the global specification.
    pub fn resolve(&self, raw: &Params) -> Result<Params> {
        resolve(raw, &self.global)
    }

    // -----------------------------------------------------------------------
    // Analysis
    // -----------------------------------------------------------------------

    /// Runs a full analysis request and returns the `results` document.
    pub async fn analyse(&self, params: Params) -> Result<Record> {
        let start = Instant::now();
        let params = self.resolve(&params)?;

        let chain = self.select(&params).await?;
        let stages = self.resolve_stages(&params, chain, true)?;
        let post = self.post_processors(&params).await?;

        let mut results = models::results();
        let request_id = results.id();
        debug!(
            request_id = %request_id,
            algorithm = %stage_names(&stages),
            "Dispatching analysis"
        );

        let (mut entries, mut analyses) = build_input(&params)?;
        for stage in &stages {
            let (out, analysis) = self.run_stage(stage, entries).await?;
            entries = out;
            analyses.push(analysis);
        }

        if let Some(model) = params.get("emotion-model").and_then(JsonValue::as_str) {
            let mode = params
                .get("conversion")
                .and_then(JsonValue::as_str)
                .and_then(ConversionMode::parse)
                .unwrap_or(self.config.conversion_mode);
            let default_from = stages.iter().rev().find_map(|stage| {
                stage
                    .plugin
                    .get("onyx:usesEmotionModel")
                    .and_then(|v| v.as_str().map(str::to_string))
            });
            let converters = self
                .registry
                .active_with_capability(Capability::EmotionConversion)
                .await;
            analyses.extend(convert_entries(
                &mut entries,
                &converters,
                model,
                default_from.as_deref(),
                mode,
            )?);
        }

        for stage in &post {
            let (out, analysis) = self.run_stage(stage, entries).await?;
            entries = out;
            analyses.push(analysis);
        }

        let entry_count = entries.len();
        results.set("analysis", analyses);
        results.set("entries", entries);
        if params
            .get("with-parameters")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
        {
            results.set("parameters", JsonValue::Object(params.clone()));
        }

        if let Err(e) = results.validate() {
            error!(request_id = %request_id, error = %e, "Analysis produced an invalid document");
            return Err(Error::Internal("Invalid result document".to_string()));
        }

        info!(
            request_id = %request_id,
            entry_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        Ok(results)
    }

    /// Plugins named by `algorithm`, or the default plugin.
    async fn select(&self, params: &Params) -> Result<Vec<Arc<Plugin>>> {
        let names = algorithm_names(params);
        if names.is_empty() {
            let plugin = self
                .registry
                .default_plugin(None)
                .await
                .ok_or(Error::NoValidAlgorithm)?;
            return Ok(vec![plugin]);
        }

        let mut chain = Vec::with_capacity(names.len());
        for name in names {
            chain.push(self.registry.active(&name).await?);
        }
        Ok(chain)
    }

    /// Resolves every stage up front, aggregating validation failures
    /// across stages. `indexed` enables `<index>.param` overrides, which
    /// only address the explicit chain.
    fn resolve_stages(
        &self,
        params: &Params,
        chain: Vec<Arc<Plugin>>,
        indexed: bool,
    ) -> Result<Vec<Stage>> {
        let mut stages = Vec::with_capacity(chain.len());
        let mut errors = Vec::new();
        let mut partial = None;

        for (index, plugin) in chain.into_iter().enumerate() {
            let scoped = filter_params(params, plugin.name(), indexed.then_some(index));
            match resolve_layered(&scoped, &self.global, plugin.extra_params()) {
                Ok(resolved) => stages.push(Stage {
                    plugin,
                    params: resolved,
                }),
                Err(Error::Validation {
                    errors: stage_errors,
                    parameters,
                    ..
                }) => {
                    debug!(
                        plugin = %plugin.name(),
                        error_count = stage_errors.len(),
                        "Stage parameters rejected"
                    );
                    errors.extend(stage_errors);
                    partial = partial.or(parameters);
                }
                Err(other) => return Err(other),
            }
        }

        if errors.is_empty() {
            Ok(stages)
        } else {
            Err(Error::invalid_params(errors, partial))
        }
    }

    async fn post_processors(&self, params: &Params) -> Result<Vec<Stage>> {
        let candidates = self
            .registry
            .active_with_capability(Capability::PostProcessing)
            .await
            .into_iter()
            .filter(|plugin| plugin.behavior().applies_to(params))
            .collect();
        self.resolve_stages(params, candidates, false)
    }

    /// Runs one stage over every entry, in order.
    async fn run_stage(&self, stage: &Stage, entries: Vec<Record>) -> Result<(Vec<Record>, Record)> {
        let plugin = &stage.plugin;
        let mut activity = Activity::new(plugin.name(), &plugin.id(), stage.params.clone());
        activity.mark_started();

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let produced = self.call(plugin, entry, &activity).await?;
            trace!(plugin = %plugin.name(), entry_count = produced.len(), "Entry analysed");
            out.extend(produced);
        }

        activity.mark_ended();
        debug!(plugin = %plugin.name(), entry_count = out.len(), "Stage complete");
        Ok((out, activity.into_record()))
    }

    /// One plugin call on one entry, under the analysis deadline.
    async fn call(&self, plugin: &Plugin, entry: Record, activity: &Activity) -> Result<Vec<Record>> {
        let deadline = Duration::from_millis(self.config.analysis_timeout_ms);
        let work = plugin
            .behavior()
            .analyse_entry(entry, activity, plugin.context());

        match tokio::time::timeout(deadline, AssertUnwindSafe(work).catch_unwind()).await {
            Ok(Ok(Ok(entries))) => Ok(entries),
            Ok(Ok(Err(e))) if e.is_declared() => Err(e),
            Ok(Ok(Err(e))) => {
                error!(plugin = %plugin.name(), error = %e, "Plugin failed during analysis");
                Err(Error::Internal(format!("Plugin '{}' failed", plugin.name())))
            }
            Ok(Err(_panic)) => {
                error!(plugin = %plugin.name(), "Plugin panicked during analysis");
                Err(Error::Internal(format!("Plugin '{}' failed", plugin.name())))
            }
            Err(_) => {
                warn!(
                    plugin = %plugin.name(),
                    after_ms = self.config.analysis_timeout_ms,
                    "Analysis deadline exceeded"
                );
                Err(Error::Timeout {
                    plugin: plugin.name().to_string(),
                    after_ms: self.config.analysis_timeout_ms,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Introspection and lifecycle
    // -----------------------------------------------------------------------

    /// Lists plugins matching `filters` (attribute/value pairs plus
    /// `plugin-type`, default `analysisPlugin`).
    pub async fn list_plugins(&self, filters: &Params) -> Result<Record> {
        let filters = resolve(&strip_output_params(filters), &plugins_params())?;
        let records = self
            .registry
            .filter(&filters)
            .await
            .iter()
            .map(|snap| snap.record())
            .collect();
        Ok(models::plugins_list(records))
    }

    pub async fn plugin_info(&self, name: &str) -> Result<Record> {
        Ok(self.registry.get(name).await?.record())
    }

    /// Activates `name`. With `sync` the call returns once the transition
    /// has finished; otherwise it returns the state right after scheduling.
    pub async fn activate_plugin(&self, name: &str, sync: bool) -> Result<PluginState> {
        let transition = self.registry.activate(name, sync).await?;
        if sync {
            transition.wait().await
        } else {
            self.registry.state(name).await
        }
    }

    pub async fn deactivate_plugin(&self, name: &str, sync: bool) -> Result<PluginState> {
        let transition = self.registry.deactivate(name, sync).await?;
        if sync {
            transition.wait().await
        } else {
            self.registry.state(name).await
        }
    }

    /// Deactivates every plugin, for shutdown.
    pub async fn shutdown(&self) {
        let results = self.registry.deactivate_all().await;
        info!(plugin_count = results.len(), "Plugins deactivated");
    }
}

impl Default for Engine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self::new(PluginRegistry::new(config.registry.clone()), config)
    }
}

fn algorithm_names(params: &Params) -> Vec<String> {
    match params.get("algorithm") {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(JsonValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(JsonValue::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn stage_names(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|s| s.plugin.name())
        .collect::<Vec<_>>()
        .join(",")
}

/// Output and transport switches are not plugin attributes.
fn strip_output_params(filters: &Params) -> Params {
    let ignored = merge_specs(&api_params(), &web_params());
    filters
        .iter()
        .filter(|(key, _)| {
            !ignored
                .iter()
                .any(|(name, spec)| name == *key || spec.aliases.iter().any(|a| a == *key))
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Entries (and prior analyses) the first stage consumes.
fn build_input(params: &Params) -> Result<(Vec<Record>, Vec<Record>)> {
    let intype = params.get("intype").and_then(JsonValue::as_str).unwrap_or("direct");
    if intype != "direct" {
        return Err(Error::plugin(
            400,
            format!("Input type '{}' is not supported", intype),
        ));
    }
    let input = params.get("input").and_then(JsonValue::as_str).unwrap_or_default();

    match params.get("informat").and_then(JsonValue::as_str).unwrap_or("text") {
        "json-ld" => {
            let value: JsonValue = serde_json::from_str(input)?;
            let document = Record::from_value(&value)?;
            let entries = document.records("entries").into_iter().cloned().collect();
            let analyses = document.records("analysis").into_iter().cloned().collect();
            Ok((entries, analyses))
        }
        _ => {
            let prefix = params.get("prefix").and_then(JsonValue::as_str).unwrap_or_default();
            let mut entry = models::entry(input);
            entry.set("@id", format!("{}#char=0,{}", prefix, input.chars().count()));
            Ok((vec![entry], Vec::new()))
        }
    }
}
