//! Plugin capability taxonomy.
//!
//! A capability decides which record kind describes the plugin and what
//! shape of annotation it is expected to produce:
//!
//! - **Analysis**: generic annotations on entries
//! - **Sentiment**: `marl:hasOpinion` judgments
//! - **Emotion**: `onyx:hasEmotionSet` annotations
//! - **Transformation**: rewrites or splits entries
//! - **EmotionConversion**: maps one emotion model onto another
//! - **PostProcessing**: runs over finished results when requested

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::kind;

/// What a plugin does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Analysis,
    Sentiment,
    Emotion,
    Transformation,
    EmotionConversion,
    PostProcessing,
}

impl Capability {
    /// All available capabilities.
    pub fn all() -> &'static [Capability] {
        &[
            Capability::Analysis,
            Capability::Sentiment,
            Capability::Emotion,
            Capability::Transformation,
            Capability::EmotionConversion,
            Capability::PostProcessing,
        ]
    }

    /// Record kind describing plugins of this capability.
    pub fn plugin_type(&self) -> &'static str {
        match self {
            Capability::Analysis => kind::ANALYSIS_PLUGIN,
            Capability::Sentiment => kind::SENTIMENT_PLUGIN,
            Capability::Emotion => kind::EMOTION_PLUGIN,
            Capability::Transformation => kind::TRANSFORMATION_PLUGIN,
            Capability::EmotionConversion => kind::EMOTION_CONVERSION_PLUGIN,
            Capability::PostProcessing => kind::POST_PROCESSING_PLUGIN,
        }
    }

    /// Parses either a plugin type (`sentimentPlugin`) or a capability name
    /// (`sentiment`, `emotion_conversion`).
    pub fn from_plugin_type(value: &str) -> Option<Capability> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', '_'], "");
        let normalized = normalized.strip_suffix("plugin").unwrap_or(&normalized);
        match normalized {
            "analysis" => Some(Capability::Analysis),
            "sentiment" => Some(Capability::Sentiment),
            "emotion" => Some(Capability::Emotion),
            "transformation" => Some(Capability::Transformation),
            "emotionconversion" | "conversion" => Some(Capability::EmotionConversion),
            "postprocessing" => Some(Capability::PostProcessing),
            _ => None,
        }
    }

    /// Whether a plugin with this capability satisfies a request for `other`.
    /// Sentiment, emotion and transformation plugins are analysis plugins.
    pub fn is_a(&self, other: Capability) -> bool {
        *self == other
            || (other == Capability::Analysis
                && matches!(
                    self,
                    Capability::Sentiment | Capability::Emotion | Capability::Transformation
                ))
    }

    /// Plugins that can be placed in an analysis chain.
    pub fn is_analyser(&self) -> bool {
        self.is_a(Capability::Analysis)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Analysis => "analysis",
            Capability::Sentiment => "sentiment",
            Capability::Emotion => "emotion",
            Capability::Transformation => "transformation",
            Capability::EmotionConversion => "emotion_conversion",
            Capability::PostProcessing => "post_processing",
        };
        f.write_str(name)
    }
}
