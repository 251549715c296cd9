//! Typed plugin objects.
//!
//! A [`Plugin`] pairs a descriptor with the behavior the factory built for
//! it and the context (store, data folder) its calls receive. It also owns
//! the plugin record published through the listing endpoints; that record
//! is validated against the plugin schema when the plugin is created.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use sentir_core::params::merge_specs;
use sentir_core::record::ID_KEY;
use sentir_core::{
    models, Capability, Error, ParamSpecs, PluginBehavior, PluginContext, Record, Result,
};

use crate::descriptor::PluginDescriptor;
use crate::registry::PluginState;

pub struct Plugin {
    descriptor: PluginDescriptor,
    capability: Capability,
    behavior: Arc<dyn PluginBehavior>,
    context: PluginContext,
    extra_params: ParamSpecs,
    info: Record,
}

impl Plugin {
    /// Builds the plugin and its record. A record that fails the plugin
    /// schema makes the descriptor invalid.
    pub fn new(
        descriptor: PluginDescriptor,
        capability: Capability,
        behavior: Arc<dyn PluginBehavior>,
        context: PluginContext,
    ) -> Result<Self> {
        let extra_params = merge_specs(&behavior.extra_params(), &descriptor.extra_params);
        let conversions = behavior.converter().map(|c| c.conversions());
        let info = build_record(&descriptor, capability, &extra_params, conversions)?;
        Ok(Self {
            descriptor,
            capability,
            behavior,
            context,
            extra_params,
            info,
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn version(&self) -> &str {
        &self.descriptor.version
    }

    /// `endpoint:plugins/{name}_{version}`
    pub fn id(&self) -> String {
        self.descriptor.id()
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn behavior(&self) -> &Arc<dyn PluginBehavior> {
        &self.behavior
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    /// Parameters declared by the behavior, overridden by the descriptor.
    pub fn extra_params(&self) -> &ParamSpecs {
        &self.extra_params
    }

    /// Attribute lookup over the plugin record.
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.info.get(key).map(|f| f.to_value())
    }

    /// The plugin record with lifecycle fields filled in.
    pub fn record(&self, state: PluginState) -> Record {
        self.info
            .clone()
            .with("is_activated", state == PluginState::Active)
            .with("state", state.to_string())
    }

    /// Whether attribute `key` equals `expected`. Strings match the textual
    /// form of numbers and booleans, so query-string filters work.
    pub fn matches(&self, key: &str, expected: &JsonValue, state: PluginState) -> bool {
        let actual = match key {
            "is_activated" => JsonValue::Bool(state == PluginState::Active),
            "state" => JsonValue::String(state.to_string()),
            _ => match self.get(key) {
                Some(value) => value,
                None => return false,
            },
        };
        value_matches(&actual, expected)
    }
}

fn value_matches(actual: &JsonValue, expected: &JsonValue) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (JsonValue::String(a), JsonValue::String(e)) => a.eq_ignore_ascii_case(e),
        (JsonValue::Bool(a), JsonValue::String(e)) => {
            let e = e.to_ascii_lowercase();
            (*a && (e == "true" || e == "1")) || (!*a && (e == "false" || e == "0"))
        }
        (JsonValue::Number(a), JsonValue::String(e)) => a.to_string() == *e,
        _ => false,
    }
}

fn build_record(
    descriptor: &PluginDescriptor,
    capability: Capability,
    extra_params: &ParamSpecs,
    conversions: Option<Vec<(String, String)>>,
) -> Result<Record> {
    let kind = models::kind_of(capability.plugin_type());
    let mut record = Record::new(&kind);

    for (key, value) in &descriptor.extra {
        record.set(key, value.clone());
    }
    record.set(ID_KEY, descriptor.id());
    record.set("name", descriptor.name.as_str());
    record.set("version", descriptor.version.as_str());
    record.set("capability", capability.to_string());
    record.set("module", descriptor.factory_key());
    if let Some(description) = &descriptor.description {
        record.set("description", description.as_str());
    }
    if let Some(author) = &descriptor.author {
        record.set("author", author.as_str());
    }
    if let Some(url) = &descriptor.url {
        record.set("url", url.as_str());
    }
    record.set(
        "requirements",
        serde_json::to_value(&descriptor.requirements)?,
    );
    record.set(
        "extra_params",
        serde_json::to_value(extra_params)?,
    );

    if let Some(conversions) = conversions {
        if !descriptor.extra.contains_key("onyx:doesConversion") {
            let declared: Vec<JsonValue> = conversions
                .into_iter()
                .map(|(from, to)| {
                    serde_json::json!({"onyx:conversionFrom": from, "onyx:conversionTo": to})
                })
                .collect();
            record.set("onyx:doesConversion", JsonValue::Array(declared));
        }
    }

    record.validate().map_err(|e| {
        Error::InvalidDescriptor(format!("plugin '{}': {}", descriptor.name, e))
    })?;
    Ok(record)
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.descriptor.name)
            .field("version", &self.descriptor.version)
            .field("capability", &self.capability)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use sentir_core::{Activity, ParamSpec};

    struct Nothing;

    #[async_trait]
    impl PluginBehavior for Nothing {
        async fn analyse_entry(
            &self,
            entry: Record,
            _activity: &Activity,
            _ctx: &PluginContext,
        ) -> Result<Vec<Record>> {
            Ok(vec![entry])
        }
    }

    fn plugin(descriptor: PluginDescriptor, capability: Capability) -> Result<Plugin> {
        let ctx = PluginContext::in_memory(descriptor.name.clone());
        Plugin::new(descriptor, capability, Arc::new(Nothing), ctx)
    }

    #[test]
    fn test_record_carries_identity_and_type() {
        let p = plugin(
            PluginDescriptor::new("rand", "0.1")
                .with_description("random")
                .with_param("seed", ParamSpec::optional())
                .with_field("onyx:usesEmotionModel", json!("emoml:big6")),
            Capability::Emotion,
        )
        .unwrap();

        let record = p.record(PluginState::Active);
        assert_eq!(record.id_ref(), Some("endpoint:plugins/rand_0.1"));
        assert_eq!(record.type_name(), "emotionPlugin");
        assert_eq!(record.get_bool("is_activated"), Some(true));
        assert_eq!(record.get_str("onyx:usesEmotionModel"), Some("emoml:big6"));
        assert!(record.get("extra_params").unwrap().to_value()["seed"].is_object());
    }

    #[test]
    fn test_attribute_matching() {
        let p = plugin(
            PluginDescriptor::new("rand", "2").with_field("author", json!("gsi")),
            Capability::Sentiment,
        )
        .unwrap();
        assert!(p.matches("author", &json!("gsi"), PluginState::Registered));
        assert!(p.matches("is_activated", &json!("false"), PluginState::Registered));
        assert!(p.matches("is_activated", &json!(true), PluginState::Active));
        assert!(p.matches("version", &json!("2"), PluginState::Active));
        assert!(!p.matches("missing", &json!("x"), PluginState::Active));
    }

    #[test]
    fn test_schema_violation_is_invalid_descriptor() {
        let err = plugin(
            PluginDescriptor::new("bad", "1").with_field("description", json!(42)),
            Capability::Analysis,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptor(_)));
    }
}
