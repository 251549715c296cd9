//! Plugins bundled with the runtime.
//!
//! | Module | Capability | Behavior |
//! |--------|------------|----------|
//! | `split` | transformation | one entry per sentence or paragraph |
//! | `centroids` | emotion_conversion | categorical ↔ dimensional emotion models |
//! | `maxemotion` | post_processing | keep only the strongest emotion |
//! | `sentiment-random` | sentiment | random polarity, for demos |
//! | `emotion-random` | emotion | random emotion intensities, for demos |

use std::sync::Arc;

use sentir_core::{Capability, PluginBehavior};

use crate::factory::PluginFactory;

pub mod centroids;
pub mod max_emotion;
pub mod random;
pub mod split;

pub use centroids::CentroidConversion;
pub use max_emotion::MaxEmotion;
pub use random::{EmotionRandom, SentimentRandom};
pub use split::Split;

/// Registers every bundled plugin module with `factory`.
pub fn register_all(factory: &mut PluginFactory) {
    factory.register("split", Capability::Transformation, |_| {
        Ok(Arc::new(Split::new()) as Arc<dyn PluginBehavior>)
    });
    factory.register("centroids", Capability::EmotionConversion, |descriptor| {
        Ok(Arc::new(CentroidConversion::from_descriptor(descriptor)?) as Arc<dyn PluginBehavior>)
    });
    factory.register("maxemotion", Capability::PostProcessing, |_| {
        Ok(Arc::new(MaxEmotion) as Arc<dyn PluginBehavior>)
    });
    factory.register("sentiment-random", Capability::Sentiment, |_| {
        Ok(Arc::new(SentimentRandom) as Arc<dyn PluginBehavior>)
    });
    factory.register("emotion-random", Capability::Emotion, |descriptor| {
        Ok(Arc::new(EmotionRandom::from_descriptor(descriptor)) as Arc<dyn PluginBehavior>)
    });
}
