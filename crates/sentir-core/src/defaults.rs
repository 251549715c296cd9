//! Centralized default constants for sentir.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration structs in the other crates fall back to these constants
//! when the matching environment variable is unset.

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Per-call analysis deadline in milliseconds.
pub const ANALYSIS_TIMEOUT_MS: u64 = 30_000;

/// Per-activation deadline in milliseconds. Activation may load large
/// lexicons or download models, hence the generous value.
pub const ACTIVATION_TIMEOUT_MS: u64 = 300_000;

// =============================================================================
// PLUGINS
// =============================================================================

/// File suffixes recognised as plugin descriptors.
pub const DESCRIPTOR_SUFFIXES: &[&str] = &[".plugin.yaml", ".plugin.yml", ".senpy"];

/// Default plugin discovery folder.
pub const PLUGIN_FOLDER: &str = "plugins";

/// Default base folder for per-plugin stores.
pub const DATA_FOLDER: &str = "data";

/// Suffix appended to a plugin name to build its store file name.
pub const STORE_SUFFIX: &str = ".store.json";

/// Capacity of the registry lifecycle event channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Prefix used to build plugin identifiers (`endpoint:plugins/{name}_{version}`).
pub const PLUGIN_ID_PREFIX: &str = "endpoint:plugins/";

/// Worker count for plugins that fan out inside a single call.
pub const WORKER_POOL_SIZE: usize = 4;

// =============================================================================
// RECORDS
// =============================================================================

/// Prefix for generated record identifiers when no base has been set.
pub const ID_PREFIX: &str = "prefix:";

/// Namespace URI the `prefix:` CURIE expands to.
pub const ID_BASE_URI: &str = "http://sentir.invalid/";

/// Default URI of the published JSON-LD context.
pub const CONTEXT_URI: &str = "http://localhost:5000/api/contexts/context.jsonld";

/// Default emotion-model conversion mode.
pub const CONVERSION_MODE: &str = "full";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default HTTP port.
pub const SERVER_PORT: u16 = 5000;

/// Largest accepted request body, in bytes.
pub const MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;
