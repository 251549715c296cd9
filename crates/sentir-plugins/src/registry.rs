//! Plugin registry and lifecycle state machine.
//!
//! Every plugin moves through
//!
//! ```text
//! REGISTERED → ACTIVATING → ACTIVE → DEACTIVATING → INACTIVE
//!                   │                     │
//!                   └──────→ FAILED ←─────┘
//! ```
//!
//! `FAILED` is terminal. At most one transition per plugin is in flight: a
//! second `activate` for the same plugin waits for the first and observes
//! its outcome instead of initializing again. The plugin table itself sits
//! behind a read/write lock so lookups from concurrent requests never wait
//! on a slow activation.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use sentir_core::{defaults, Capability, Error, Params, PluginContext, Result};

use crate::descriptor::PluginDescriptor;
use crate::discovery::{discover, DiscoveryReport};
use crate::factory::PluginFactory;
use crate::installer::{CommandInstaller, DependencyInstaller, NoopInstaller};
use crate::plugin::Plugin;
use crate::store::{FileStore, StoreRecovery};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Configuration for the plugin registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Folders searched for plugin descriptors.
    pub plugin_folders: Vec<PathBuf>,
    /// Base folder for per-plugin stores.
    pub data_folder: PathBuf,
    /// Deadline for one activation or deactivation, in milliseconds.
    pub activation_timeout_ms: u64,
    /// Command used to install plugin requirements; `None` skips installation.
    pub install_command: Option<String>,
    /// Activate every plugin after loading.
    pub activate_all: bool,
    /// Abort loading when any descriptor fails.
    pub strict_discovery: bool,
    /// What to do with corrupted plugin stores.
    pub store_recovery: StoreRecovery,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            plugin_folders: vec![PathBuf::from(defaults::PLUGIN_FOLDER)],
            data_folder: PathBuf::from(defaults::DATA_FOLDER),
            activation_timeout_ms: defaults::ACTIVATION_TIMEOUT_MS,
            install_command: None,
            activate_all: true,
            strict_discovery: false,
            store_recovery: StoreRecovery::Discard,
        }
    }
}

impl RegistryConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SENTIR_PLUGIN_FOLDERS` | `plugins` | `:`-separated descriptor folders |
    /// | `SENTIR_DATA_FOLDER` | `data` | Base folder for plugin stores |
    /// | `SENTIR_ACTIVATION_TIMEOUT_MS` | `300000` | Per-activation deadline |
    /// | `SENTIR_INSTALL_COMMAND` | unset | Requirement installer, e.g. `pip install` |
    /// | `SENTIR_ACTIVATE_ALL` | `true` | Activate every plugin at startup |
    /// | `SENTIR_STRICT_DISCOVERY` | `false` | Fail startup on any bad descriptor |
    /// | `SENTIR_STORE_RECOVERY` | `discard` | `discard` or `fail` on corrupted stores |
    pub fn from_env() -> Self {
        let plugin_folders = std::env::var("SENTIR_PLUGIN_FOLDERS")
            .ok()
            .map(|v| {
                v.split(':')
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from)
                    .collect::<Vec<_>>()
            })
            .filter(|folders| !folders.is_empty())
            .unwrap_or_else(|| vec![PathBuf::from(defaults::PLUGIN_FOLDER)]);

        let data_folder = std::env::var("SENTIR_DATA_FOLDER")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::DATA_FOLDER));

        let activation_timeout_ms = std::env::var("SENTIR_ACTIVATION_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::ACTIVATION_TIMEOUT_MS);

        let install_command = std::env::var("SENTIR_INSTALL_COMMAND")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let activate_all = std::env::var("SENTIR_ACTIVATE_ALL")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let strict_discovery = std::env::var("SENTIR_STRICT_DISCOVERY")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let store_recovery = match std::env::var("SENTIR_STORE_RECOVERY").as_deref() {
            Ok("fail") => StoreRecovery::Fail,
            _ => StoreRecovery::Discard,
        };

        Self {
            plugin_folders,
            data_folder,
            activation_timeout_ms,
            install_command,
            activate_all,
            strict_discovery,
            store_recovery,
        }
    }

    pub fn with_plugin_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.plugin_folders = folders;
        self
    }

    pub fn with_data_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.data_folder = folder.into();
        self
    }

    pub fn with_activation_timeout_ms(mut self, ms: u64) -> Self {
        self.activation_timeout_ms = ms;
        self
    }

    pub fn with_activate_all(mut self, activate_all: bool) -> Self {
        self.activate_all = activate_all;
        self
    }

    pub fn with_strict_discovery(mut self, strict: bool) -> Self {
        self.strict_discovery = strict;
        self
    }

    pub fn with_store_recovery(mut self, recovery: StoreRecovery) -> Self {
        self.store_recovery = recovery;
        self
    }
}

// =============================================================================
// STATE AND EVENTS
// =============================================================================

/// Lifecycle state of one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginState {
    Registered,
    Activating,
    Active,
    Deactivating,
    Inactive,
    Failed,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PluginState::Registered => "REGISTERED",
            PluginState::Activating => "ACTIVATING",
            PluginState::Active => "ACTIVE",
            PluginState::Deactivating => "DEACTIVATING",
            PluginState::Inactive => "INACTIVE",
            PluginState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Event emitted by the registry.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Registered { plugin: String },
    Activating { plugin: String },
    Activated { plugin: String, duration_ms: u64 },
    Deactivating { plugin: String },
    Deactivated { plugin: String },
    Failed { plugin: String, error: String },
}

/// A plugin together with the state it was in when looked up.
#[derive(Debug, Clone)]
pub struct PluginSnapshot {
    pub plugin: Arc<Plugin>,
    pub state: PluginState,
}

impl PluginSnapshot {
    pub fn record(&self) -> sentir_core::Record {
        self.plugin.record(self.state)
    }
}

/// Result of loading a batch of descriptors.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub registered: Vec<String>,
    pub failures: Vec<(String, Error)>,
}

// =============================================================================
// TRANSITION HANDLE
// =============================================================================

/// Outcome of an activation or deactivation request.
///
/// Synchronous requests return a finished transition; background requests
/// return one that can be awaited later with [`Transition::wait`].
pub struct Transition {
    plugin: String,
    inner: TransitionInner,
}

enum TransitionInner {
    Done(Result<PluginState>),
    Pending(JoinHandle<Result<PluginState>>),
}

impl Transition {
    fn done(plugin: &str, outcome: Result<PluginState>) -> Self {
        Self {
            plugin: plugin.to_string(),
            inner: TransitionInner::Done(outcome),
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn is_finished(&self) -> bool {
        match &self.inner {
            TransitionInner::Done(_) => true,
            TransitionInner::Pending(handle) => handle.is_finished(),
        }
    }

    /// Waits for the transition to complete.
    pub async fn wait(self) -> Result<PluginState> {
        match self.inner {
            TransitionInner::Done(outcome) => outcome,
            TransitionInner::Pending(handle) => handle.await.map_err(|e| {
                Error::Internal(format!(
                    "transition task for '{}' did not complete: {}",
                    self.plugin, e
                ))
            })?,
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

struct Slot {
    plugin: Arc<Plugin>,
    state: StdMutex<PluginState>,
    transition: Mutex<()>,
    activated_seq: AtomicU64,
}

impl Slot {
    fn new(plugin: Plugin) -> Self {
        Self {
            plugin: Arc::new(plugin),
            state: StdMutex::new(PluginState::Registered),
            transition: Mutex::new(()),
            activated_seq: AtomicU64::new(0),
        }
    }

    fn state(&self) -> PluginState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, state: PluginState) {
        match self.state.lock() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }

    fn snapshot(&self) -> PluginSnapshot {
        PluginSnapshot {
            plugin: self.plugin.clone(),
            state: self.state(),
        }
    }
}

struct Inner {
    config: RegistryConfig,
    factory: PluginFactory,
    installer: Arc<dyn DependencyInstaller>,
    slots: RwLock<HashMap<String, Arc<Slot>>>,
    events: broadcast::Sender<RegistryEvent>,
    activation_counter: AtomicU64,
}

/// Process-wide table of plugins. Cheap to clone.
#[derive(Clone)]
pub struct PluginRegistry {
    inner: Arc<Inner>,
}

impl PluginRegistry {
    /// Create an empty registry with the built-in plugin factory.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_factory(config, PluginFactory::with_builtins())
    }

    pub fn with_factory(config: RegistryConfig, factory: PluginFactory) -> Self {
        let installer: Arc<dyn DependencyInstaller> = match config
            .install_command
            .as_deref()
            .and_then(CommandInstaller::from_command_line)
        {
            Some(installer) => Arc::new(installer),
            None => Arc::new(NoopInstaller),
        };
        Self::with_installer(config, factory, installer)
    }

    pub fn with_installer(
        config: RegistryConfig,
        factory: PluginFactory,
        installer: Arc<dyn DependencyInstaller>,
    ) -> Self {
        let (events, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                factory,
                installer,
                slots: RwLock::new(HashMap::new()),
                events,
                activation_counter: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: RegistryEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Builds a typed plugin from its descriptor.
    pub fn instantiate(&self, descriptor: PluginDescriptor) -> Result<Plugin> {
        let (capability, behavior) = self.inner.factory.build(&descriptor)?;
        let store = FileStore::for_plugin(
            &self.inner.config.data_folder,
            &descriptor.name,
            self.inner.config.store_recovery,
        );
        let context = PluginContext::new(
            descriptor.name.clone(),
            self.inner.config.data_folder.clone(),
            Box::new(store),
        );
        Plugin::new(descriptor, capability, behavior, context)
    }

    /// Adds a plugin. A second plugin with the same name is a configuration
    /// error.
    pub async fn register(&self, plugin: Plugin) -> Result<()> {
        let name = plugin.name().to_string();
        {
            let mut slots = self.inner.slots.write().await;
            if slots.contains_key(&name) {
                return Err(Error::Configuration(format!(
                    "plugin '{}' is already registered",
                    name
                )));
            }
            info!(
                plugin = %name,
                plugin_version = %plugin.version(),
                capability = %plugin.capability(),
                "Registering plugin"
            );
            slots.insert(name.clone(), Arc::new(Slot::new(plugin)));
        }
        self.emit(RegistryEvent::Registered { plugin: name });
        Ok(())
    }

    /// Instantiates and registers one descriptor.
    pub async fn register_descriptor(&self, descriptor: PluginDescriptor) -> Result<()> {
        let plugin = self.instantiate(descriptor)?;
        self.register(plugin).await
    }

    /// Registers a batch of descriptors. A broken descriptor is recorded and
    /// skipped; a duplicate name aborts the batch.
    pub async fn load(&self, descriptors: Vec<PluginDescriptor>) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for descriptor in descriptors {
            let name = descriptor.name.clone();
            match self.register_descriptor(descriptor).await {
                Ok(()) => report.registered.push(name),
                Err(e @ Error::Configuration(_)) => return Err(e),
                Err(e) => {
                    warn!(plugin = %name, error = %e, "Plugin could not be loaded");
                    report.failures.push((name, e));
                }
            }
        }
        Ok(report)
    }

    /// Discovers descriptors in the configured folders and registers them.
    ///
    /// With `strict_discovery`, any descriptor or instantiation failure is
    /// returned as one aggregated configuration error.
    pub async fn load_from_folders(&self) -> Result<(DiscoveryReport, LoadReport)> {
        let discovery = discover(&self.inner.config.plugin_folders)?;
        if self.inner.config.strict_discovery {
            if let Some(err) = discovery.failure_summary() {
                return Err(err);
            }
        }
        let load = self.load(discovery.descriptors.clone()).await?;
        if self.inner.config.strict_discovery && !load.failures.is_empty() {
            let lines: Vec<String> = load
                .failures
                .iter()
                .map(|(name, e)| format!("{}: {}", name, e))
                .collect();
            return Err(Error::Configuration(format!(
                "{} plugin(s) failed to load: {}",
                load.failures.len(),
                lines.join("; ")
            )));
        }
        Ok((discovery, load))
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    async fn slot(&self, name: &str) -> Result<Arc<Slot>> {
        self.inner
            .slots
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::PluginNotFound(name.to_string()))
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.slots.read().await.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.inner.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Plugin by name, in any state.
    pub async fn get(&self, name: &str) -> Result<PluginSnapshot> {
        Ok(self.slot(name).await?.snapshot())
    }

    pub async fn state(&self, name: &str) -> Result<PluginState> {
        Ok(self.slot(name).await?.state())
    }

    /// Plugin by name, only if it is active.
    pub async fn active(&self, name: &str) -> Result<Arc<Plugin>> {
        let slot = self.slot(name).await?;
        if slot.state() != PluginState::Active {
            return Err(Error::NotActivated(name.to_string()));
        }
        Ok(slot.plugin.clone())
    }

    /// Every plugin, sorted by name.
    pub async fn all(&self) -> Vec<PluginSnapshot> {
        let mut out: Vec<PluginSnapshot> = self
            .inner
            .slots
            .read()
            .await
            .values()
            .map(|slot| slot.snapshot())
            .collect();
        out.sort_by(|a, b| a.plugin.name().cmp(b.plugin.name()));
        out
    }

    /// Plugins matching every attribute/value pair in `filters`.
    ///
    /// `plugin-type` (or `plugin_type`, `pluginType`) filters by capability
    /// following the taxonomy: `analysisPlugin` also matches sentiment,
    /// emotion and transformation plugins, and `plugin` matches everything.
    /// `is_activated` compares against the lifecycle state.
    pub async fn filter(&self, filters: &Params) -> Vec<PluginSnapshot> {
        self.all()
            .await
            .into_iter()
            .filter(|snap| {
                filters.iter().all(|(key, expected)| match key.as_str() {
                    "plugin-type" | "plugin_type" | "pluginType" => {
                        matches_type(snap.plugin.capability(), expected)
                    }
                    _ => snap.plugin.matches(key, expected, snap.state),
                })
            })
            .collect()
    }

    /// Active plugins with `capability`, sorted by name.
    pub async fn active_with_capability(&self, capability: Capability) -> Vec<Arc<Plugin>> {
        self.all()
            .await
            .into_iter()
            .filter(|snap| snap.state == PluginState::Active && snap.plugin.capability() == capability)
            .map(|snap| snap.plugin)
            .collect()
    }

    /// The most recently activated active plugin that satisfies
    /// `capability` (any analysis plugin when `None`).
    pub async fn default_plugin(&self, capability: Option<Capability>) -> Option<Arc<Plugin>> {
        let wanted = capability.unwrap_or(Capability::Analysis);
        let slots = self.inner.slots.read().await;
        let chosen = slots
            .values()
            .filter(|slot| slot.state() == PluginState::Active)
            .filter(|slot| slot.plugin.capability().is_a(wanted))
            .max_by_key(|slot| slot.activated_seq.load(Ordering::SeqCst))
            .map(|slot| slot.plugin.clone());
        debug!(
            capability = %wanted,
            plugin = chosen.as_ref().map(|p| p.name()).unwrap_or("<none>"),
            "Selected default plugin"
        );
        chosen
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Activates `name`. With `sync` the returned transition is already
    /// finished; otherwise activation continues in the background.
    pub async fn activate(&self, name: &str, sync: bool) -> Result<Transition> {
        let slot = self.slot(name).await?;
        if sync {
            let outcome = self.run_activation(slot).await;
            return Ok(Transition::done(name, outcome));
        }
        let registry = self.clone();
        let handle = tokio::spawn(async move { registry.run_activation(slot).await });
        Ok(Transition {
            plugin: name.to_string(),
            inner: TransitionInner::Pending(handle),
        })
    }

    /// Deactivates `name`, synchronously or in the background.
    pub async fn deactivate(&self, name: &str, sync: bool) -> Result<Transition> {
        let slot = self.slot(name).await?;
        if sync {
            let outcome = self.run_deactivation(slot).await;
            return Ok(Transition::done(name, outcome));
        }
        let registry = self.clone();
        let handle = tokio::spawn(async move { registry.run_deactivation(slot).await });
        Ok(Transition {
            plugin: name.to_string(),
            inner: TransitionInner::Pending(handle),
        })
    }

    /// Activates every registered plugin concurrently and waits for all.
    pub async fn activate_all(&self) -> Vec<(String, Result<PluginState>)> {
        let slots: Vec<Arc<Slot>> = self.inner.slots.read().await.values().cloned().collect();
        let runs = slots.into_iter().map(|slot| {
            let name = slot.plugin.name().to_string();
            async move { (name, self.run_activation(slot).await) }
        });
        let results = futures::future::join_all(runs).await;
        info!(
            plugin_count = results.len(),
            failed = results.iter().filter(|(_, r)| r.is_err()).count(),
            "Activated plugins"
        );
        results
    }

    /// Deactivates every active plugin and waits for all.
    pub async fn deactivate_all(&self) -> Vec<(String, Result<PluginState>)> {
        let slots: Vec<Arc<Slot>> = self.inner.slots.read().await.values().cloned().collect();
        let runs = slots.into_iter().map(|slot| {
            let name = slot.plugin.name().to_string();
            async move { (name, self.run_deactivation(slot).await) }
        });
        futures::future::join_all(runs).await
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.inner.config.activation_timeout_ms)
    }

    async fn run_activation(&self, slot: Arc<Slot>) -> Result<PluginState> {
        let _transition = slot.transition.lock().await;
        let plugin = slot.plugin.clone();
        let name = plugin.name().to_string();

        match slot.state() {
            PluginState::Active => return Ok(PluginState::Active),
            PluginState::Failed => {
                return Err(Error::Configuration(format!(
                    "plugin '{}' failed and cannot be activated",
                    name
                )))
            }
            _ => {}
        }

        slot.set_state(PluginState::Activating);
        self.emit(RegistryEvent::Activating {
            plugin: name.clone(),
        });
        info!(plugin = %name, "Activating plugin");
        let start = Instant::now();

        let work = async {
            self.inner
                .installer
                .install(&name, &plugin.descriptor().requirements)
                .await?;
            plugin.behavior().activate(plugin.context()).await?;
            plugin.context().flush().await
        };
        let outcome = self.guarded(&name, "activation", work).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                let seq = self.inner.activation_counter.fetch_add(1, Ordering::SeqCst) + 1;
                slot.activated_seq.store(seq, Ordering::SeqCst);
                slot.set_state(PluginState::Active);
                info!(plugin = %name, duration_ms, state = %PluginState::Active, "Plugin activated");
                self.emit(RegistryEvent::Activated {
                    plugin: name,
                    duration_ms,
                });
                Ok(PluginState::Active)
            }
            Err(e) => {
                slot.set_state(PluginState::Failed);
                error!(plugin = %name, duration_ms, error = %e, "Plugin activation failed");
                self.emit(RegistryEvent::Failed {
                    plugin: name,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_deactivation(&self, slot: Arc<Slot>) -> Result<PluginState> {
        let _transition = slot.transition.lock().await;
        let plugin = slot.plugin.clone();
        let name = plugin.name().to_string();

        let current = slot.state();
        if current != PluginState::Active {
            debug!(plugin = %name, state = %current, "Plugin not active, nothing to deactivate");
            return Ok(current);
        }

        slot.set_state(PluginState::Deactivating);
        self.emit(RegistryEvent::Deactivating {
            plugin: name.clone(),
        });
        info!(plugin = %name, "Deactivating plugin");

        let work = async {
            plugin.behavior().deactivate(plugin.context()).await?;
            plugin.context().flush().await
        };
        match self.guarded(&name, "deactivation", work).await {
            Ok(()) => {
                slot.set_state(PluginState::Inactive);
                info!(plugin = %name, state = %PluginState::Inactive, "Plugin deactivated");
                self.emit(RegistryEvent::Deactivated { plugin: name });
                Ok(PluginState::Inactive)
            }
            Err(e) => {
                slot.set_state(PluginState::Failed);
                error!(plugin = %name, error = %e, "Plugin deactivation failed");
                self.emit(RegistryEvent::Failed {
                    plugin: name,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Runs lifecycle work under the activation deadline, turning panics
    /// into errors.
    async fn guarded<F>(&self, name: &str, what: &str, work: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        let timeout = self.timeout();
        match tokio::time::timeout(timeout, AssertUnwindSafe(work).catch_unwind()).await {
            Ok(Ok(result)) => result,
            Ok(Err(_panic)) => Err(Error::Internal(format!(
                "plugin '{}' panicked during {}",
                name, what
            ))),
            Err(_) => Err(Error::Timeout {
                plugin: name.to_string(),
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

fn matches_type(capability: Capability, expected: &JsonValue) -> bool {
    let Some(wanted) = expected.as_str() else {
        return false;
    };
    if wanted.eq_ignore_ascii_case("plugin") || wanted.eq_ignore_ascii_case("all") {
        return true;
    }
    match Capability::from_plugin_type(wanted) {
        Some(wanted) => capability.is_a(wanted),
        None => false,
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("config", &self.inner.config)
            .finish()
    }
}
