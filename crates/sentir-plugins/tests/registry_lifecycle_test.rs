//! Integration tests for the plugin registry.
//!
//! This suite validates:
//! - Descriptors discovered on disk become registered plugins
//! - Duplicate plugin names are a configuration error
//! - Concurrent synchronous activations initialize a plugin exactly once
//! - Background activation does not block lookups of other plugins
//! - Plugin stores written during activation survive a registry restart

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use sentir_core::{
    Activity, Capability, Error, Params, PluginBehavior, PluginContext, Record, Result,
};
use sentir_plugins::{
    PluginDescriptor, PluginFactory, PluginRegistry, PluginState, RegistryConfig, RegistryEvent,
};

// ============================================================================
// HELPERS
// ============================================================================

/// Counts activations and records a marker in its store.
struct Lexicon {
    activations: AtomicUsize,
    delay: Duration,
}

impl Lexicon {
    fn new(delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            activations: AtomicUsize::new(0),
            delay: Duration::from_millis(delay_ms),
        })
    }
}

#[async_trait]
impl PluginBehavior for Lexicon {
    async fn activate(&self, ctx: &PluginContext) -> Result<()> {
        let n = self.activations.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        ctx.with_store(|store| store.set("loaded", json!(n))).await
    }

    async fn analyse_entry(
        &self,
        entry: Record,
        _activity: &Activity,
        _ctx: &PluginContext,
    ) -> Result<Vec<Record>> {
        Ok(vec![entry])
    }
}

fn factory_with(lexicon: Arc<Lexicon>) -> PluginFactory {
    let mut factory = PluginFactory::with_builtins();
    factory.register("lexicon", Capability::Sentiment, move |_| {
        Ok(lexicon.clone() as Arc<dyn PluginBehavior>)
    });
    factory
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn config(plugins: &TempDir, data: &TempDir) -> RegistryConfig {
    RegistryConfig::default()
        .with_plugin_folders(vec![plugins.path().to_path_buf()])
        .with_data_folder(data.path())
        .with_activation_timeout_ms(5_000)
}

// ============================================================================
// DISCOVERY AND REGISTRATION
// ============================================================================

#[tokio::test]
async fn test_load_from_folders_registers_valid_descriptors() {
    let plugins = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write(
        plugins.path(),
        "split/split.plugin.yaml",
        "name: split\nversion: '0.3'\nmodule: split\n",
    );
    write(
        plugins.path(),
        "rand/rand.senpy",
        "name: sentiment-random\nversion: 0.1\nauthor: '@balkian'\n",
    );
    write(plugins.path(), "broken/broken.plugin.yaml", "description: no name\n");

    let registry = PluginRegistry::with_factory(config(&plugins, &data), factory_with(Lexicon::new(0)));
    let (discovery, load) = registry.load_from_folders().await.unwrap();

    assert_eq!(discovery.failures.len(), 1);
    assert_eq!(load.registered.len(), 2);
    assert_eq!(registry.state("split").await.unwrap(), PluginState::Registered);

    let snapshot = registry.get("sentiment-random").await.unwrap();
    let record = snapshot.record();
    assert_eq!(record.type_name(), "sentimentPlugin");
    assert_eq!(record.id_ref(), Some("endpoint:plugins/sentiment-random_0.1"));
    assert_eq!(record.get_str("author"), Some("@balkian"));
    assert_eq!(record.get_bool("is_activated"), Some(false));

    let split = registry.get("split").await.unwrap();
    assert!(split.plugin.extra_params().contains_key("delimiter"));
}

#[tokio::test]
async fn test_strict_discovery_aborts_on_bad_descriptor() {
    let plugins = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write(plugins.path(), "ok.plugin.yaml", "name: split\nversion: '1'\n");
    write(plugins.path(), "bad.plugin.yaml", "name: [unclosed\n");

    let registry = PluginRegistry::with_factory(
        config(&plugins, &data).with_strict_discovery(true),
        factory_with(Lexicon::new(0)),
    );
    let err = registry.load_from_folders().await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_duplicate_names_are_rejected() {
    let data = TempDir::new().unwrap();
    let registry = PluginRegistry::with_factory(
        RegistryConfig::default().with_data_folder(data.path()),
        factory_with(Lexicon::new(0)),
    );
    registry
        .register_descriptor(PluginDescriptor::new("dup", "1").with_module("lexicon"))
        .await
        .unwrap();
    let err = registry
        .register_descriptor(PluginDescriptor::new("dup", "1").with_module("split"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_concurrent_sync_activation_runs_once() {
    let data = TempDir::new().unwrap();
    let lexicon = Lexicon::new(50);
    let registry = PluginRegistry::with_factory(
        RegistryConfig::default().with_data_folder(data.path()),
        factory_with(lexicon.clone()),
    );
    registry
        .register_descriptor(PluginDescriptor::new("X", "1").with_module("lexicon"))
        .await
        .unwrap();

    let mut callers = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        callers.push(tokio::spawn(async move {
            registry.activate("X", true).await?.wait().await
        }));
    }
    for caller in callers {
        assert_eq!(caller.await.unwrap().unwrap(), PluginState::Active);
    }

    assert_eq!(lexicon.activations.load(Ordering::SeqCst), 1);
    assert_eq!(registry.state("X").await.unwrap(), PluginState::Active);
}

#[tokio::test]
async fn test_background_activation_does_not_block_other_plugins() {
    let data = TempDir::new().unwrap();
    let registry = PluginRegistry::with_factory(
        RegistryConfig::default().with_data_folder(data.path()),
        factory_with(Lexicon::new(200)),
    );
    registry
        .register_descriptor(PluginDescriptor::new("slow", "1").with_module("lexicon"))
        .await
        .unwrap();
    registry
        .register_descriptor(PluginDescriptor::new("split", "0.3"))
        .await
        .unwrap();
    registry.activate("split", true).await.unwrap().wait().await.unwrap();

    let mut events = registry.subscribe();
    let pending = registry.activate("slow", false).await.unwrap();

    // Lookups and filtering proceed while "slow" is activating.
    assert!(registry.active("split").await.is_ok());
    let mut filters = Params::new();
    filters.insert("is_activated".into(), json!(true));
    let active: Vec<_> = registry
        .filter(&filters)
        .await
        .into_iter()
        .map(|s| s.plugin.name().to_string())
        .collect();
    assert_eq!(active, vec!["split"]);

    assert_eq!(pending.wait().await.unwrap(), PluginState::Active);
    let mut saw_activated = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, RegistryEvent::Activated { ref plugin, .. } if plugin == "slow") {
            saw_activated = true;
        }
    }
    assert!(saw_activated);
}

#[tokio::test]
async fn test_store_survives_restart() {
    let data = TempDir::new().unwrap();
    {
        let registry = PluginRegistry::with_factory(
            RegistryConfig::default().with_data_folder(data.path()),
            factory_with(Lexicon::new(0)),
        );
        registry
            .register_descriptor(PluginDescriptor::new("lex", "1").with_module("lexicon"))
            .await
            .unwrap();
        registry.activate("lex", true).await.unwrap().wait().await.unwrap();
        registry.deactivate_all().await;
        assert_eq!(registry.state("lex").await.unwrap(), PluginState::Inactive);
    }
    assert!(data.path().join("lex.store.json").exists());

    let registry = PluginRegistry::with_factory(
        RegistryConfig::default().with_data_folder(data.path()),
        factory_with(Lexicon::new(0)),
    );
    registry
        .register_descriptor(PluginDescriptor::new("lex", "1").with_module("lexicon"))
        .await
        .unwrap();
    let plugin = registry.get("lex").await.unwrap().plugin;
    let loaded = plugin
        .context()
        .with_store(|store| store.get("loaded"))
        .await
        .unwrap();
    assert_eq!(loaded, Some(json!(1)));
}

#[tokio::test]
async fn test_activate_all_reports_each_plugin() {
    let data = TempDir::new().unwrap();
    let registry = PluginRegistry::with_factory(
        RegistryConfig::default().with_data_folder(data.path()),
        factory_with(Lexicon::new(0)),
    );
    registry
        .load(vec![
            PluginDescriptor::new("split", "0.3"),
            PluginDescriptor::new("maxemotion", "0.1"),
            PluginDescriptor::new("emotion-random", "0.1"),
        ])
        .await
        .unwrap();

    let results = registry.activate_all().await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|(_, r)| matches!(r, Ok(PluginState::Active))));
    assert_eq!(
        registry
            .default_plugin(Some(Capability::Emotion))
            .await
            .unwrap()
            .name(),
        "emotion-random"
    );
}
