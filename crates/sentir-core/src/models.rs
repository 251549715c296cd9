//! Built-in record kinds and constructors for the analysis document model.
//!
//! Every kind is declared once in [`kinds()`] with its defaults, alias views
//! and schema. Constructors such as [`entry`] or [`sentiment`] are thin
//! helpers over [`Record::new`].

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};

use crate::error::Result;
use crate::record::{KindRegistry, Record, RecordKind};

/// Type names of the built-in kinds.
pub mod kind {
    pub const ENTRY: &str = "entry";
    pub const SENTIMENT: &str = "sentiment";
    pub const EMOTION: &str = "emotion";
    pub const EMOTION_SET: &str = "emotionSet";
    pub const EMOTION_MODEL: &str = "emotionModel";
    pub const ENTITY: &str = "entity";
    pub const TOPIC: &str = "topic";
    pub const ANALYSIS: &str = "analysis";
    pub const PARAMETER: &str = "parameter";
    pub const RESULTS: &str = "results";
    pub const ERROR: &str = "error";
    pub const PLUGINS: &str = "plugins";
    pub const PLUGIN: &str = "plugin";
    pub const ANALYSIS_PLUGIN: &str = "analysisPlugin";
    pub const SENTIMENT_PLUGIN: &str = "sentimentPlugin";
    pub const EMOTION_PLUGIN: &str = "emotionPlugin";
    pub const TRANSFORMATION_PLUGIN: &str = "transformationPlugin";
    pub const EMOTION_CONVERSION_PLUGIN: &str = "emotionConversionPlugin";
    pub const POST_PROCESSING_PLUGIN: &str = "postProcessingPlugin";
}

static KINDS: Lazy<KindRegistry> =
    Lazy::new(|| builtin_kinds().expect("built-in record kinds must be valid"));

static BASE_CONTEXT: Lazy<JsonValue> = Lazy::new(|| {
    json!({
        "@vocab": "http://www.gsi.upm.es/onto/senpy/ns#",
        "prefix": crate::defaults::ID_BASE_URI,
        "endpoint": "http://localhost:5000/api/",
        "marl": "http://www.gsi.upm.es/ontologies/marl/ns#",
        "onyx": "http://www.gsi.upm.es/ontologies/onyx/ns#",
        "nif": "http://persistence.uni-leipzig.org/nlp2rdf/ontologies/nif-core#",
        "prov": "http://www.w3.org/ns/prov#",
        "emoml": "http://www.gsi.upm.es/ontologies/onyx/vocabularies/emotionml/ns#",
        "wna": "http://www.gsi.upm.es/ontologies/wnaffect/ns#",
        "xsd": "http://www.w3.org/2001/XMLSchema#",
        "dc": "http://dublincore.org/2012/06/14/dcelements#",
        "entries": {"@id": "prov:used", "@container": "@set"},
        "analysis": {"@id": "AnalysisInvolved", "@container": "@set"},
        "marl:hasOpinion": {"@container": "@set"},
        "onyx:hasEmotionSet": {"@container": "@set"},
        "onyx:hasEmotion": {"@container": "@set"},
        "prov:used": {"@container": "@set"},
        "prov:wasAssociatedWith": {"@type": "@id"},
        "prov:wasDerivedFrom": {"@type": "@id"},
        "prov:wasGeneratedBy": {"@type": "@id"},
        "onyx:usesEmotionModel": {"@type": "@id"},
        "onyx:hasEmotionCategory": {"@type": "@id"},
        "marl:hasPolarity": {"@type": "@id"}
    })
});

/// Registry holding every built-in kind.
pub fn kinds() -> &'static KindRegistry {
    &KINDS
}

/// The JSON-LD context every response is rendered against by default.
pub fn base_context() -> &'static JsonValue {
    &BASE_CONTEXT
}

/// Built-in kind by type name, or the generic kind when unknown.
pub fn kind_of(type_name: &str) -> Arc<RecordKind> {
    KINDS.get(type_name).unwrap_or_else(|| KINDS.generic())
}

fn builtin_kinds() -> Result<KindRegistry> {
    let mut registry = KindRegistry::new();

    let sentiment = RecordKind::builder(kind::SENTIMENT)
        .alias("polarity", "marl:hasPolarity")
        .alias("polarityValue", "marl:polarityValue")
        .schema(sentiment_schema())
        .build()?;
    let emotion = RecordKind::builder(kind::EMOTION)
        .alias("category", "onyx:hasEmotionCategory")
        .alias("intensity", "onyx:hasEmotionIntensity")
        .schema(emotion_schema())
        .build()?;
    let emotion_set = RecordKind::builder(kind::EMOTION_SET)
        .alias_with_default("emotions", "onyx:hasEmotion", json!([]))
        .alias("model", "onyx:usesEmotionModel")
        .schema(emotion_set_schema())
        .build()?;
    let emotion_model = RecordKind::builder(kind::EMOTION_MODEL)
        .default("onyx:hasEmotionCategory", json!([]))
        .build()?;
    let entity = RecordKind::builder(kind::ENTITY).build()?;
    let topic = RecordKind::builder(kind::TOPIC).build()?;
    let entry = RecordKind::builder(kind::ENTRY)
        .alias("text", "nif:isString")
        .alias_with_default("sentiments", "marl:hasOpinion", json!([]))
        .alias_with_default("emotions", "onyx:hasEmotionSet", json!([]))
        .alias("entities", "senpy:hasEntity")
        .alias("topics", "senpy:hasTopic")
        .terse(&["nif:isString", "marl:hasOpinion", "onyx:hasEmotionSet"])
        .schema(entry_schema())
        .build()?;
    let analysis = RecordKind::builder(kind::ANALYSIS)
        .alias_with_default("parameters", "prov:used", json!([]))
        .alias("algorithm", "prov:wasAssociatedWith")
        .schema(analysis_schema())
        .build()?;
    let parameter = RecordKind::builder(kind::PARAMETER).build()?;
    let results = RecordKind::builder(kind::RESULTS)
        .default("analysis", json!([]))
        .default("entries", json!([]))
        .terse(&["entries"])
        .schema(results_schema())
        .build()?;
    let error = RecordKind::builder(kind::ERROR)
        .terse(&["status", "message", "kind", "errors"])
        .schema(error_schema())
        .build()?;
    let plugins = RecordKind::builder(kind::PLUGINS)
        .default("plugins", json!([]))
        .terse(&["plugins"])
        .build()?;

    let plugin = RecordKind::builder(kind::PLUGIN)
        .default("extra_params", json!({}))
        .default("is_activated", json!(false))
        .default("requirements", json!([]))
        .terse(&["name", "version", "is_activated"])
        .schema(plugin_schema())
        .build()?;
    let analysis_plugin = RecordKind::builder(kind::ANALYSIS_PLUGIN)
        .extends(&plugin)
        .build()?;
    let sentiment_plugin = RecordKind::builder(kind::SENTIMENT_PLUGIN)
        .extends(&analysis_plugin)
        .default("marl:minPolarityValue", json!(0))
        .default("marl:maxPolarityValue", json!(1))
        .build()?;
    let emotion_plugin = RecordKind::builder(kind::EMOTION_PLUGIN)
        .extends(&analysis_plugin)
        .default("onyx:minEmotionValue", json!(0))
        .default("onyx:maxEmotionValue", json!(1))
        .build()?;
    let transformation_plugin = RecordKind::builder(kind::TRANSFORMATION_PLUGIN)
        .extends(&analysis_plugin)
        .build()?;
    let conversion_plugin = RecordKind::builder(kind::EMOTION_CONVERSION_PLUGIN)
        .extends(&plugin)
        .default("onyx:doesConversion", json!([]))
        .build()?;
    let post_processing_plugin = RecordKind::builder(kind::POST_PROCESSING_PLUGIN)
        .extends(&plugin)
        .build()?;

    for k in [
        sentiment,
        emotion,
        emotion_set,
        emotion_model,
        entity,
        topic,
        entry,
        analysis,
        parameter,
        results,
        error,
        plugins,
        plugin,
        analysis_plugin,
        sentiment_plugin,
        emotion_plugin,
        transformation_plugin,
        conversion_plugin,
        post_processing_plugin,
    ] {
        registry.register(k)?;
    }
    Ok(registry)
}

// =============================================================================
// Schemas
// =============================================================================

fn sentiment_schema() -> JsonValue {
    json!({
        "title": "sentiment",
        "type": "object",
        "properties": {
            "marl:hasPolarity": {
                "type": "string",
                "enum": ["marl:Positive", "marl:Negative", "marl:Neutral"]
            },
            "marl:polarityValue": {"type": "number"}
        }
    })
}

fn emotion_schema() -> JsonValue {
    json!({
        "title": "emotion",
        "type": "object",
        "properties": {
            "onyx:hasEmotionCategory": {"type": "string"},
            "onyx:hasEmotionIntensity": {"type": "number"}
        }
    })
}

fn emotion_set_schema() -> JsonValue {
    json!({
        "title": "emotionSet",
        "type": "object",
        "properties": {
            "onyx:hasEmotion": {"type": "array", "items": emotion_schema()},
            "onyx:usesEmotionModel": {"type": "string"}
        }
    })
}

fn entry_schema() -> JsonValue {
    json!({
        "title": "entry",
        "type": "object",
        "required": ["nif:isString"],
        "properties": {
            "nif:isString": {"type": "string"},
            "marl:hasOpinion": {"type": "array", "items": sentiment_schema()},
            "onyx:hasEmotionSet": {"type": "array", "items": emotion_set_schema()}
        }
    })
}

fn analysis_schema() -> JsonValue {
    json!({
        "title": "analysis",
        "type": "object",
        "properties": {
            "prov:wasAssociatedWith": {"type": "string"},
            "prov:used": {"type": "array"}
        }
    })
}

fn results_schema() -> JsonValue {
    json!({
        "title": "results",
        "type": "object",
        "required": ["entries"],
        "properties": {
            "entries": {"type": "array", "items": entry_schema()},
            "analysis": {"type": "array", "items": analysis_schema()}
        }
    })
}

fn error_schema() -> JsonValue {
    json!({
        "title": "error",
        "type": "object",
        "required": ["message", "status"],
        "properties": {
            "message": {"type": "string"},
            "status": {"type": "integer"},
            "errors": {"type": "array"},
            "parameters": {"type": "object"}
        }
    })
}

fn plugin_schema() -> JsonValue {
    json!({
        "title": "plugin",
        "type": "object",
        "required": ["name", "version"],
        "properties": {
            "name": {"type": "string", "minLength": 1},
            "version": {"type": "string", "minLength": 1},
            "description": {"type": "string"},
            "author": {"type": "string"},
            "is_activated": {"type": "boolean"},
            "extra_params": {"type": "object"},
            "requirements": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// =============================================================================
// Constructors
// =============================================================================

/// New entry holding `text`.
pub fn entry(text: impl Into<String>) -> Record {
    Record::new(&kind_of(kind::ENTRY)).with("nif:isString", text.into())
}

/// New sentiment with a polarity (`marl:Positive`, ...) and optional value.
pub fn sentiment(polarity: &str, value: Option<f64>) -> Record {
    let mut record = Record::new(&kind_of(kind::SENTIMENT)).with("marl:hasPolarity", polarity);
    if let Some(value) = value {
        record.set("marl:polarityValue", value);
    }
    record
}

/// New emotion with a category and optional intensity.
pub fn emotion(category: &str, intensity: Option<f64>) -> Record {
    let mut record =
        Record::new(&kind_of(kind::EMOTION)).with("onyx:hasEmotionCategory", category);
    if let Some(intensity) = intensity {
        record.set("onyx:hasEmotionIntensity", intensity);
    }
    record
}

pub fn emotion_set() -> Record {
    Record::new(&kind_of(kind::EMOTION_SET))
}

/// New analysis (provenance) record associated with a plugin id.
pub fn analysis(plugin_id: &str) -> Record {
    Record::new(&kind_of(kind::ANALYSIS)).with("prov:wasAssociatedWith", plugin_id)
}

pub fn parameter(name: &str, value: JsonValue) -> Record {
    Record::new(&kind_of(kind::PARAMETER))
        .with("name", name)
        .with("value", value)
}

pub fn results() -> Record {
    Record::new(&kind_of(kind::RESULTS))
}

pub fn error_record(status: u16, message: impl Into<String>) -> Record {
    Record::new(&kind_of(kind::ERROR))
        .with("status", u64::from(status))
        .with("message", message.into())
}

pub fn plugins_list(plugins: Vec<Record>) -> Record {
    Record::new(&kind_of(kind::PLUGINS)).with("plugins", plugins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_builtin_kinds_are_registered() {
        let names = kinds().names();
        for expected in [
            kind::ENTRY,
            kind::RESULTS,
            kind::ERROR,
            kind::SENTIMENT_PLUGIN,
            kind::EMOTION_CONVERSION_PLUGIN,
        ] {
            assert!(names.contains(&expected), "{expected}");
        }
    }

    #[test]
    fn test_every_kind_constant_resolves() {
        let built = builtin_kinds().unwrap();
        assert_eq!(built.names(), kinds().names());

        for name in [
            kind::ENTRY,
            kind::SENTIMENT,
            kind::EMOTION,
            kind::EMOTION_SET,
            kind::EMOTION_MODEL,
            kind::ENTITY,
            kind::TOPIC,
            kind::ANALYSIS,
            kind::PARAMETER,
            kind::RESULTS,
            kind::ERROR,
            kind::PLUGINS,
            kind::PLUGIN,
            kind::ANALYSIS_PLUGIN,
            kind::SENTIMENT_PLUGIN,
            kind::EMOTION_PLUGIN,
            kind::TRANSFORMATION_PLUGIN,
            kind::EMOTION_CONVERSION_PLUGIN,
            kind::POST_PROCESSING_PLUGIN,
        ] {
            assert!(kinds().get(name).is_some(), "{name}");
            assert_eq!(kind_of(name).type_name(), name);
        }
        assert!(base_context().is_object());
    }

    #[test]
    fn test_entry_aliases() {
        let mut e = entry("hello");
        assert_eq!(e.get_str("text"), Some("hello"));
        e.push("sentiments", sentiment("marl:Positive", Some(0.8)));
        assert_eq!(e.records("marl:hasOpinion").len(), 1);
        assert_eq!(
            e.records("sentiments")[0].get_f64("polarityValue"),
            Some(0.8)
        );
        assert!(e.validate().is_ok());
    }

    #[test]
    fn test_entry_requires_text() {
        let e = Record::new(&kind_of(kind::ENTRY));
        let err = e.validate().unwrap_err();
        match err {
            Error::Validation { errors, .. } => {
                assert!(errors.iter().any(|f| f.reason.contains("nif:isString")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_results_validate_nested_entries() {
        let mut r = results();
        r.push("entries", entry("ok"));
        assert!(r.validate().is_ok());

        r.push("entries", Record::new(&kind_of(kind::ENTRY)));
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_bad_polarity_is_rejected() {
        let mut e = entry("x");
        e.push("sentiments", sentiment("marl:Confused", None));
        assert!(e.validate().is_err());
    }

    #[test]
    fn test_plugin_kinds_inherit_defaults() {
        let p = Record::new(&kind_of(kind::SENTIMENT_PLUGIN));
        assert_eq!(p.get_bool("is_activated"), Some(false));
        assert_eq!(p.get_f64("marl:maxPolarityValue"), Some(1.0));
        assert_eq!(p.type_name(), kind::SENTIMENT_PLUGIN);
    }

    #[test]
    fn test_emotion_set_default_list() {
        let mut set = emotion_set();
        set.push("emotions", emotion("wna:joy", Some(1.0)));
        assert_eq!(set.records("onyx:hasEmotion").len(), 1);
    }

    #[test]
    fn test_unknown_kind_falls_back_to_generic() {
        assert_eq!(kind_of("nothing").type_name(), "record");
    }
}
