//! Engine configuration.

use sentir_core::defaults;
use sentir_plugins::RegistryConfig;

use crate::conversion::ConversionMode;

/// Configuration for the analysis engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for one plugin call on one entry, in milliseconds.
    pub analysis_timeout_ms: u64,
    /// Published context URI, used for `Link` headers and `@context`
    /// references.
    pub context_uri: String,
    /// Conversion mode when a request does not pick one.
    pub conversion_mode: ConversionMode,
    /// Plugin registry settings.
    pub registry: RegistryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis_timeout_ms: defaults::ANALYSIS_TIMEOUT_MS,
            context_uri: defaults::CONTEXT_URI.to_string(),
            conversion_mode: ConversionMode::Full,
            registry: RegistryConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SENTIR_ANALYSIS_TIMEOUT_MS` | `30000` | Per-call analysis deadline |
    /// | `SENTIR_CONTEXT_URI` | `http://localhost:5000/api/contexts/context.jsonld` | Published context |
    /// | `SENTIR_CONVERSION_MODE` | `full` | `full`, `filtered` or `nested` |
    ///
    /// Registry variables are documented on [`RegistryConfig::from_env`].
    pub fn from_env() -> Self {
        let analysis_timeout_ms = std::env::var("SENTIR_ANALYSIS_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::ANALYSIS_TIMEOUT_MS);

        let context_uri = std::env::var("SENTIR_CONTEXT_URI")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| defaults::CONTEXT_URI.to_string());

        let conversion_mode = std::env::var("SENTIR_CONVERSION_MODE")
            .ok()
            .and_then(|v| ConversionMode::parse(&v))
            .unwrap_or(ConversionMode::Full);

        Self {
            analysis_timeout_ms,
            context_uri,
            conversion_mode,
            registry: RegistryConfig::from_env(),
        }
    }

    pub fn with_analysis_timeout_ms(mut self, ms: u64) -> Self {
        self.analysis_timeout_ms = ms;
        self
    }

    pub fn with_context_uri(mut self, uri: impl Into<String>) -> Self {
        self.context_uri = uri.into();
        self
    }

    pub fn with_conversion_mode(mut self, mode: ConversionMode) -> Self {
        self.conversion_mode = mode;
        self
    }

    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}
