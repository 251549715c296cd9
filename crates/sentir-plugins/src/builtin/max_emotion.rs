//! Post-processing that keeps only the strongest emotion.
//!
//! Runs when the request carries a truthy `maxemotion` parameter. The first
//! emotion set of each entry is reduced to its highest-intensity emotion;
//! when every intensity is zero the survivor becomes `neutral` at full
//! intensity.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use sentir_core::{Activity, Params, PluginBehavior, PluginContext, Record, Result};

pub const TRIGGER_PARAM: &str = "maxemotion";

#[derive(Debug, Default, Clone, Copy)]
pub struct MaxEmotion;

fn intensity(emotion: &Record) -> f64 {
    emotion.get_f64("onyx:hasEmotionIntensity").unwrap_or(0.0)
}

/// Reduces `set` to its strongest emotion. Sets with fewer than two
/// emotions are left alone.
fn reduce(set: &mut Record, activity_id: &str) {
    let emotions: Vec<Record> = set
        .records("onyx:hasEmotion")
        .into_iter()
        .cloned()
        .collect();
    if emotions.len() < 2 {
        return;
    }

    let mut strongest = emotions[0].clone();
    for emotion in &emotions[1..] {
        if intensity(emotion) > intensity(&strongest) {
            strongest = emotion.clone();
        }
    }
    if intensity(&strongest) == 0.0 {
        strongest.set("onyx:hasEmotionCategory", "neutral");
        strongest.set("onyx:hasEmotionIntensity", 1.0);
    }

    set.set("onyx:hasEmotion", vec![strongest]);
    set.set("prov:wasGeneratedBy", activity_id);
}

#[async_trait]
impl PluginBehavior for MaxEmotion {
    async fn analyse_entry(
        &self,
        mut entry: Record,
        activity: &Activity,
        _ctx: &PluginContext,
    ) -> Result<Vec<Record>> {
        if let Some(set) = entry.records_mut("onyx:hasEmotionSet").into_iter().next() {
            reduce(set, activity.id());
        }
        Ok(vec![entry])
    }

    fn applies_to(&self, params: &Params) -> bool {
        match params.get(TRIGGER_PARAM) {
            None | Some(JsonValue::Null) | Some(JsonValue::Bool(false)) => false,
            Some(JsonValue::String(s)) => !matches!(s.to_ascii_lowercase().as_str(), "false" | "0"),
            Some(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sentir_core::models;

    fn entry_with(intensities: &[(&str, f64)]) -> Record {
        let mut set = models::emotion_set();
        for (category, value) in intensities {
            set.push("onyx:hasEmotion", models::emotion(category, Some(*value)));
        }
        let mut entry = models::entry("Test");
        entry.push("onyx:hasEmotionSet", set);
        entry
    }

    async fn run(entry: Record) -> Record {
        let activity = Activity::new("maxemotion", "endpoint:plugins/maxemotion_0.1", Params::new());
        MaxEmotion
            .analyse_entry(entry, &activity, &PluginContext::in_memory("maxemotion"))
            .await
            .unwrap()
            .remove(0)
    }

    fn survivors(entry: &Record) -> Vec<(String, f64)> {
        entry.records("onyx:hasEmotionSet")[0]
            .records("onyx:hasEmotion")
            .iter()
            .map(|e| (e.get_str("onyx:hasEmotionCategory").unwrap().to_string(), intensity(e)))
            .collect()
    }

    #[tokio::test]
    async fn test_keeps_strongest() {
        let out = run(entry_with(&[("anger", 0.0), ("joy", 0.33), ("sadness", 0.1)])).await;
        assert_eq!(survivors(&out), vec![("joy".to_string(), 0.33)]);
        assert!(out.records("onyx:hasEmotionSet")[0].contains("prov:wasGeneratedBy"));
    }

    #[tokio::test]
    async fn test_all_zero_becomes_neutral() {
        let out = run(entry_with(&[("anger", 0.0), ("joy", 0.0)])).await;
        assert_eq!(survivors(&out), vec![("neutral".to_string(), 1.0)]);
    }

    #[tokio::test]
    async fn test_single_emotion_untouched() {
        let out = run(entry_with(&[("joy", 0.0)])).await;
        assert_eq!(survivors(&out), vec![("joy".to_string(), 0.0)]);
        assert!(run(models::entry("no emotions")).await.records("onyx:hasEmotionSet").is_empty());
    }

    #[test]
    fn test_trigger() {
        let mut params = Params::new();
        assert!(!MaxEmotion.applies_to(&params));
        params.insert(TRIGGER_PARAM.into(), json!(""));
        assert!(MaxEmotion.applies_to(&params));
        params.insert(TRIGGER_PARAM.into(), json!("false"));
        assert!(!MaxEmotion.applies_to(&params));
    }
}
