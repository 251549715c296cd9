//! Random annotators, useful for demos and for exercising the pipeline.

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value as JsonValue;
use tokio::task::JoinSet;
use tracing::debug;

use sentir_core::defaults::WORKER_POOL_SIZE;
use sentir_core::{models, Activity, Error, PluginBehavior, PluginContext, Record, Result};

use crate::descriptor::PluginDescriptor;

const BIG6_MODEL: &str = "emoml:big6";
const BIG6: &[&str] = &[
    "emoml:big6anger",
    "emoml:big6disgust",
    "emoml:big6fear",
    "emoml:big6happiness",
    "emoml:big6sadness",
    "emoml:big6surprise",
];

// =============================================================================
// SENTIMENT
// =============================================================================

/// Adds one sentiment with a uniformly random polarity value in `[-1, 1]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SentimentRandom;

fn polarity_of(value: f64) -> &'static str {
    if value > 0.0 {
        "marl:Positive"
    } else if value < 0.0 {
        "marl:Negative"
    } else {
        "marl:Neutral"
    }
}

#[async_trait]
impl PluginBehavior for SentimentRandom {
    async fn analyse_entry(
        &self,
        mut entry: Record,
        activity: &Activity,
        _ctx: &PluginContext,
    ) -> Result<Vec<Record>> {
        let value: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
        let sentiment = models::sentiment(polarity_of(value), Some(value))
            .with("prov:wasGeneratedBy", activity.id());
        entry.push("marl:hasOpinion", sentiment);
        Ok(vec![entry])
    }
}

// =============================================================================
// EMOTION
// =============================================================================

/// Adds one emotion set with a random intensity per category.
///
/// Intensities are drawn by a bounded pool of tasks that all finish before
/// the call returns. Descriptor keys: `onyx:usesEmotionModel` (default
/// `emoml:big6`), `categories` (default the big six), `workers` (default
/// [`WORKER_POOL_SIZE`]).
#[derive(Debug, Clone)]
pub struct EmotionRandom {
    model: String,
    categories: Vec<String>,
    workers: usize,
}

impl Default for EmotionRandom {
    fn default() -> Self {
        Self {
            model: BIG6_MODEL.to_string(),
            categories: BIG6.iter().map(|c| c.to_string()).collect(),
            workers: WORKER_POOL_SIZE,
        }
    }
}

impl EmotionRandom {
    pub fn from_descriptor(descriptor: &PluginDescriptor) -> Self {
        let mut plugin = Self::default();
        if let Some(model) = descriptor.get("onyx:usesEmotionModel").and_then(JsonValue::as_str) {
            plugin.model = model.to_string();
        }
        if let Some(categories) = descriptor.get("categories").and_then(JsonValue::as_array) {
            let categories: Vec<String> = categories
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect();
            if !categories.is_empty() {
                plugin.categories = categories;
            }
        }
        if let Some(workers) = descriptor.get("workers").and_then(JsonValue::as_u64) {
            plugin.workers = (workers as usize).max(1);
        }
        plugin
    }

    /// One intensity per category, in category order.
    async fn draw(&self) -> Result<Vec<f64>> {
        let mut intensities = vec![0.0; self.categories.len()];
        let indices: Vec<usize> = (0..self.categories.len()).collect();

        for batch in indices.chunks(self.workers) {
            let mut tasks = JoinSet::new();
            for &index in batch {
                tasks.spawn(async move {
                    let value: f64 = rand::thread_rng().gen_range(0.0..1.0);
                    (index, value)
                });
            }
            while let Some(joined) = tasks.join_next().await {
                let (index, value) = joined
                    .map_err(|e| Error::Internal(format!("emotion worker failed: {}", e)))?;
                intensities[index] = value;
            }
        }
        debug!(
            categories = self.categories.len(),
            workers = self.workers,
            "Drew random intensities"
        );
        Ok(intensities)
    }
}

#[async_trait]
impl PluginBehavior for EmotionRandom {
    async fn analyse_entry(
        &self,
        mut entry: Record,
        activity: &Activity,
        _ctx: &PluginContext,
    ) -> Result<Vec<Record>> {
        let intensities = self.draw().await?;
        let mut set = models::emotion_set()
            .with("onyx:usesEmotionModel", self.model.as_str())
            .with("prov:wasGeneratedBy", activity.id());
        for (category, intensity) in self.categories.iter().zip(intensities) {
            set.push("onyx:hasEmotion", models::emotion(category, Some(intensity)));
        }
        entry.push("onyx:hasEmotionSet", set);
        Ok(vec![entry])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sentir_core::Params;

    fn activity(name: &str) -> Activity {
        Activity::new(name, &format!("endpoint:plugins/{}_0.1", name), Params::new())
    }

    #[tokio::test]
    async fn test_sentiment_polarity_matches_value() {
        let ctx = PluginContext::in_memory("sentiment-random");
        for _ in 0..20 {
            let out = SentimentRandom
                .analyse_entry(models::entry("Hello"), &activity("sentiment-random"), &ctx)
                .await
                .unwrap();
            let entry = &out[0];
            entry.validate().unwrap();
            let sentiment = entry.records("marl:hasOpinion")[0];
            let value = sentiment.get_f64("marl:polarityValue").unwrap();
            assert!((-1.0..=1.0).contains(&value));
            assert_eq!(sentiment.get_str("marl:hasPolarity"), Some(polarity_of(value)));
        }
    }

    #[tokio::test]
    async fn test_emotion_set_covers_every_category() {
        let plugin = EmotionRandom::from_descriptor(
            &PluginDescriptor::new("emotion-random", "0.1")
                .with_field("categories", json!(["a", "b", "c", "d", "e"]))
                .with_field("workers", json!(2)),
        );
        let out = plugin
            .analyse_entry(
                models::entry("Hello"),
                &activity("emotion-random"),
                &PluginContext::in_memory("emotion-random"),
            )
            .await
            .unwrap();

        let set = out[0].records("onyx:hasEmotionSet")[0];
        assert_eq!(set.get_str("onyx:usesEmotionModel"), Some(BIG6_MODEL));
        let categories: Vec<_> = set
            .records("onyx:hasEmotion")
            .iter()
            .map(|e| e.get_str("onyx:hasEmotionCategory").unwrap().to_string())
            .collect();
        assert_eq!(categories, vec!["a", "b", "c", "d", "e"]);
        for emotion in set.records("onyx:hasEmotion") {
            let intensity = emotion.get_f64("onyx:hasEmotionIntensity").unwrap();
            assert!((0.0..1.0).contains(&intensity));
        }
    }

    #[test]
    fn test_defaults() {
        let plugin = EmotionRandom::from_descriptor(&PluginDescriptor::new("e", "1"));
        assert_eq!(plugin.categories.len(), 6);
        assert_eq!(plugin.workers, WORKER_POOL_SIZE);
    }
}
