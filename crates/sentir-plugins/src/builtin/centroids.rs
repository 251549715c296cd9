//! Centroid-based emotion model conversion.
//!
//! Maps a categorical model (e.g. `emoml:big6`) onto a dimensional one
//! (e.g. valence/arousal/dominance) and back, using one labelled centroid
//! per category. Descriptor keys:
//!
//! ```yaml
//! module: centroids
//! centroids_direction: ["emoml:big6", "emoml:pad-dimensions"]
//! centroids:
//!   anger: {A: 6.95, D: 5.1, V: 2.7}
//!   joy:   {A: 7.22, D: 6.28, V: 8.6}
//! aliases:                 # optional renames for categories and dimensions
//!   A: "emoml:pad-dimensions_arousal"
//! neutralValue: 5.0        # or neutralPoints: {A: 5.0, ...}
//! categories: [joy, anger] # optional iteration order, default as declared
//! ```
//!
//! Forward conversion sums the centroids of the categories present, each
//! weighted by its intensity relative to `onyx:maxIntensityValue` and
//! pulled towards the neutral point. Backward conversion picks the nearest
//! centroid by squared Euclidean distance; ties go to the first category in
//! iteration order. The distance is reported as `onyx:algorithmConfidence`.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use sentir_core::{
    models, Activity, EmotionConverter, Error, PluginBehavior, PluginContext, Record, Result,
};

use crate::descriptor::PluginDescriptor;

pub const CONFIDENCE_KEY: &str = "onyx:algorithmConfidence";
const MAX_INTENSITY_KEY: &str = "onyx:maxIntensityValue";

type Point = BTreeMap<String, f64>;

#[derive(Debug, Clone)]
pub struct CentroidConversion {
    categorical: String,
    dimensional: String,
    centroids: Vec<(String, Point)>,
    dimensions: BTreeSet<String>,
    neutral: Point,
}

impl CentroidConversion {
    /// Builds the converter from descriptor keys.
    pub fn from_descriptor(descriptor: &PluginDescriptor) -> Result<Self> {
        let invalid = |reason: &str| {
            Error::InvalidDescriptor(format!("plugin '{}': {}", descriptor.name, reason))
        };

        let raw = descriptor
            .get("centroids")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| invalid("centroid conversion plugins must provide `centroids`"))?;
        let direction: Vec<&str> = descriptor
            .get("centroids_direction")
            .and_then(JsonValue::as_array)
            .map(|v| v.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default();
        let [categorical, dimensional] = direction.as_slice() else {
            return Err(invalid("`centroids_direction` must be [from, to]"));
        };

        let aliases: BTreeMap<String, String> = descriptor
            .get("aliases")
            .and_then(JsonValue::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        let rename = |key: &str| aliases.get(key).cloned().unwrap_or_else(|| key.to_string());

        // Declared order, which is also the tie-break order.
        let mut declared: Vec<(String, Point)> = Vec::with_capacity(raw.len());
        for (category, coordinates) in raw {
            let coordinates = coordinates
                .as_object()
                .ok_or_else(|| invalid(&format!("centroid '{}' must be a mapping", category)))?;
            let point = parse_point(coordinates, &rename).map_err(|e| invalid(&e))?;
            declared.push((rename(category), point));
        }

        let mut centroids = Vec::with_capacity(declared.len());
        if let Some(list) = descriptor.get("categories").and_then(JsonValue::as_array) {
            for category in list.iter().filter_map(JsonValue::as_str).map(|c| rename(c)) {
                let Some(pos) = declared.iter().position(|(name, _)| *name == category) else {
                    return Err(invalid(&format!("unknown category '{}' in `categories`", category)));
                };
                centroids.push(declared.remove(pos));
            }
        }
        // Categories left out of an explicit order still take part, after it.
        centroids.extend(declared);

        let dimensions: BTreeSet<String> = centroids
            .iter()
            .flat_map(|(_, point)| point.keys().cloned())
            .collect();

        let neutral_value = descriptor
            .get("neutralValue")
            .and_then(JsonValue::as_f64)
            .unwrap_or(0.0);
        let mut neutral = match descriptor.get("neutralPoints").and_then(JsonValue::as_object) {
            Some(points) => parse_point(points, &rename).map_err(|e| invalid(&e))?,
            None => Point::new(),
        };
        for dimension in &dimensions {
            neutral.entry(dimension.clone()).or_insert(neutral_value);
        }

        Ok(Self {
            categorical: categorical.to_string(),
            dimensional: dimensional.to_string(),
            centroids,
            dimensions,
            neutral,
        })
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.centroids.iter().map(|(name, _)| name.as_str())
    }

    fn neutral(&self, dimension: &str) -> f64 {
        self.neutral.get(dimension).copied().unwrap_or(0.0)
    }

    fn centroid(&self, category: &str) -> Option<&Point> {
        self.centroids
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, point)| point)
    }

    /// Categorical set → one dimensional emotion.
    pub fn forward(&self, set: &Record) -> Record {
        let max_intensity = set.get_f64(MAX_INTENSITY_KEY).unwrap_or(1.0);
        let mut sum = Point::new();
        for emotion in set.records("onyx:hasEmotion") {
            let Some(category) = emotion.get_str("onyx:hasEmotionCategory") else {
                continue;
            };
            let intensity = emotion
                .get_f64("onyx:hasEmotionIntensity")
                .unwrap_or(max_intensity)
                / max_intensity;
            if intensity == 0.0 {
                continue;
            }
            let Some(centroid) = self.centroid(category) else {
                continue;
            };
            for (dimension, value) in centroid {
                let neutral = self.neutral(dimension);
                *sum.entry(dimension.clone()).or_insert(0.0) +=
                    value * intensity + neutral * (1.0 - intensity);
            }
        }

        let mut emotion = Record::new(&models::kind_of(models::kind::EMOTION));
        for (dimension, value) in sum {
            emotion.set(&dimension, value);
        }
        emotion
    }

    /// Squared distance from `point` to the centroid of `category`.
    /// Missing coordinates sit at the neutral point.
    fn distance(&self, centroid: &Point, point: &Record) -> f64 {
        self.dimensions
            .iter()
            .map(|dimension| {
                let neutral = self.neutral(dimension);
                let c = centroid.get(dimension).copied().unwrap_or(neutral);
                let p = point.get_f64(dimension).unwrap_or(neutral);
                (c - p).powi(2)
            })
            .sum()
    }

    /// Dimensional emotion → nearest category.
    pub fn backward(&self, point: &Record) -> Result<Record> {
        let mut best: Option<(&str, f64)> = None;
        for (category, centroid) in &self.centroids {
            let distance = self.distance(centroid, point);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((category, distance));
            }
        }
        let (category, distance) =
            best.ok_or_else(|| Error::plugin(500, "no centroids to convert to"))?;
        debug!(category, distance, "Nearest centroid");

        let mut emotion = models::emotion(category, None);
        emotion.set(CONFIDENCE_KEY, distance);
        Ok(emotion)
    }
}

fn parse_point(
    values: &Map<String, JsonValue>,
    rename: &dyn Fn(&str) -> String,
) -> std::result::Result<Point, String> {
    values
        .iter()
        .map(|(dimension, value)| {
            value
                .as_f64()
                .map(|v| (rename(dimension), v))
                .ok_or_else(|| format!("coordinate '{}' must be a number", dimension))
        })
        .collect()
}

impl EmotionConverter for CentroidConversion {
    fn conversions(&self) -> Vec<(String, String)> {
        vec![
            (self.categorical.clone(), self.dimensional.clone()),
            (self.dimensional.clone(), self.categorical.clone()),
        ]
    }

    fn convert(&self, set: &Record, from: &str, to: &str) -> Result<Record> {
        let mut out = models::emotion_set().with("onyx:usesEmotionModel", to);
        if from == self.categorical && to == self.dimensional {
            out.push("onyx:hasEmotion", self.forward(set));
        } else if from == self.dimensional && to == self.categorical {
            for emotion in set.records("onyx:hasEmotion") {
                out.push("onyx:hasEmotion", self.backward(emotion)?);
            }
        } else {
            return Err(Error::plugin(
                400,
                format!("Cannot convert from {} to {}", from, to),
            ));
        }
        Ok(out)
    }
}

#[async_trait]
impl PluginBehavior for CentroidConversion {
    async fn analyse_entry(
        &self,
        entry: Record,
        _activity: &Activity,
        _ctx: &PluginContext,
    ) -> Result<Vec<Record>> {
        Ok(vec![entry])
    }

    fn converter(&self) -> Option<&dyn EmotionConverter> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BIG6: &str = "emoml:big6";
    const DIMS: &str = "emoml:fsre-dimensions";

    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new("CentroidTest", "0")
            .with_module("centroids")
            .with_field(
                "centroids",
                json!({
                    "c1": {"V1": 0.5, "V2": 0.5},
                    "c2": {"V1": -0.5, "V2": 0.5},
                    "c3": {"V1": -0.5, "V2": -0.5},
                    "c4": {"V1": 0.5, "V2": -0.5}
                }),
            )
            .with_field("aliases", json!({"V1": "X-dimension", "V2": "Y-dimension"}))
            .with_field("centroids_direction", json!([BIG6, DIMS]))
    }

    fn set_of(categories: &[(&str, Option<f64>)]) -> Record {
        let mut set = models::emotion_set();
        for (category, intensity) in categories {
            set.push("onyx:hasEmotion", models::emotion(category, *intensity));
        }
        set
    }

    fn point(x: f64, y: f64) -> Record {
        Record::new(&models::kind_of(models::kind::EMOTION))
            .with("X-dimension", x)
            .with("Y-dimension", y)
    }

    #[test]
    fn test_forward_weighted_sum() {
        let conv = CentroidConversion::from_descriptor(&descriptor()).unwrap();

        let res = conv.forward(&set_of(&[("c1", None)]));
        assert_eq!(res.get_f64("X-dimension"), Some(0.5));
        assert_eq!(res.get_f64("Y-dimension"), Some(0.5));

        let res = conv.forward(&set_of(&[("c1", None), ("c2", None)]));
        assert_eq!(res.get_f64("X-dimension"), Some(0.0));
        assert_eq!(res.get_f64("Y-dimension"), Some(1.0));
    }

    #[test]
    fn test_backward_nearest_centroid() {
        let conv = CentroidConversion::from_descriptor(&descriptor()).unwrap();
        let res = conv.backward(&point(-0.2, -0.3)).unwrap();
        assert_eq!(res.get_str("onyx:hasEmotionCategory"), Some("c3"));
        let res = conv.backward(&point(-0.2, 0.3)).unwrap();
        assert_eq!(res.get_str("onyx:hasEmotionCategory"), Some("c2"));
    }

    #[test]
    fn test_pure_category_reproduces_centroid_and_back() {
        let conv = CentroidConversion::from_descriptor(
            &descriptor().with_field("neutralValue", json!(0.3)),
        )
        .unwrap();
        for (category, x, y) in [("c1", 0.5, 0.5), ("c2", -0.5, 0.5), ("c3", -0.5, -0.5), ("c4", 0.5, -0.5)] {
            let res = conv.forward(&set_of(&[(category, Some(1.0))]));
            assert_eq!(res.get_f64("X-dimension"), Some(x));
            assert_eq!(res.get_f64("Y-dimension"), Some(y));

            let back = conv.backward(&point(x, y)).unwrap();
            assert_eq!(back.get_str("onyx:hasEmotionCategory"), Some(category));
            assert_eq!(back.get_f64(CONFIDENCE_KEY), Some(0.0));
        }
    }

    #[test]
    fn test_tie_goes_to_first_category() {
        let conv = CentroidConversion::from_descriptor(&descriptor()).unwrap();
        let res = conv.backward(&point(0.0, 0.0)).unwrap();
        assert_eq!(res.get_str("onyx:hasEmotionCategory"), Some("c1"));

        let yaml = r#"
name: tie
version: "1"
module: centroids
centroids_direction: ["emoml:big6", "emoml:fsre-dimensions"]
centroids:
  joy: {V: 1.0}
  anger: {V: -1.0}
"#;
        let declared =
            CentroidConversion::from_descriptor(&PluginDescriptor::from_yaml(yaml, None).unwrap())
                .unwrap();
        assert_eq!(declared.categories().collect::<Vec<_>>(), vec!["joy", "anger"]);
        let middle = Record::new(&models::kind_of(models::kind::EMOTION)).with("V", 0.0);
        let res = declared.backward(&middle).unwrap();
        assert_eq!(res.get_str("onyx:hasEmotionCategory"), Some("joy"));

        let ordered = CentroidConversion::from_descriptor(
            &descriptor().with_field("categories", json!(["c3", "c1"])),
        )
        .unwrap();
        assert_eq!(ordered.categories().collect::<Vec<_>>(), vec!["c3", "c1", "c2", "c4"]);
        let res = ordered.backward(&point(0.0, 0.0)).unwrap();
        assert_eq!(res.get_str("onyx:hasEmotionCategory"), Some("c3"));
    }

    #[test]
    fn test_zero_intensity_and_scaling() {
        let conv = CentroidConversion::from_descriptor(&descriptor()).unwrap();
        let mut set = set_of(&[("c1", Some(5.0)), ("c3", Some(0.0))]);
        set.set(MAX_INTENSITY_KEY, 10.0);
        let res = conv.forward(&set);
        assert_eq!(res.get_f64("X-dimension"), Some(0.25));
    }

    #[test]
    fn test_convert_both_directions() {
        let conv = CentroidConversion::from_descriptor(&descriptor()).unwrap();
        assert!(conv.can_convert(Some(BIG6), DIMS));
        assert!(conv.can_convert(None, BIG6));
        assert!(!conv.can_convert(Some(BIG6), "emoml:other"));

        let dimensional = conv.convert(&set_of(&[("c4", None)]), BIG6, DIMS).unwrap();
        assert_eq!(dimensional.get_str("onyx:usesEmotionModel"), Some(DIMS));
        let categorical = conv.convert(&dimensional, DIMS, BIG6).unwrap();
        assert_eq!(
            categorical.records("onyx:hasEmotion")[0].get_str("onyx:hasEmotionCategory"),
            Some("c4")
        );

        let err = conv.convert(&dimensional, BIG6, BIG6).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_descriptor_requirements() {
        let err = CentroidConversion::from_descriptor(&PluginDescriptor::new("c", "1")).unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptor(_)));

        let err = CentroidConversion::from_descriptor(
            &PluginDescriptor::new("c", "1").with_field("centroids", json!({"a": {"x": 1}})),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptor(m) if m.contains("centroids_direction")));
    }
}
