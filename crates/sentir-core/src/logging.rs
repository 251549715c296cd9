//! Structured logging schema and field name constants for sentir.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query the same field across the registry, the
//! orchestrator and the transport.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Plugin failed to activate, unexpected failure inside analysis |
//! | WARN  | Recoverable issue (bad descriptor skipped, corrupted store rebuilt) |
//! | INFO  | Lifecycle events (registration, activation, shutdown) |
//! | DEBUG | Decision points (plugin selection, parameter resolution) |
//! | TRACE | Per-entry iteration inside a chain stage |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one analysis request.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "engine", "registry", "discovery", "store"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "analyse", "activate", "resolve", "convert"
pub const OPERATION: &str = "op";

// ─── Plugin fields ─────────────────────────────────────────────────────────

/// Plugin canonical name.
pub const PLUGIN: &str = "plugin";

/// Plugin version string.
pub const PLUGIN_VERSION: &str = "plugin_version";

/// Plugin capability ("sentiment", "emotion", ...).
pub const CAPABILITY: &str = "capability";

/// Lifecycle state after a transition.
pub const STATE: &str = "state";

/// Descriptor file path being loaded.
pub const DESCRIPTOR: &str = "descriptor";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of entries produced by a chain stage.
pub const ENTRY_COUNT: &str = "entry_count";

/// Number of plugins affected by a bulk operation.
pub const PLUGIN_COUNT: &str = "plugin_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// HTTP-style status of a returned error.
pub const STATUS: &str = "status";
