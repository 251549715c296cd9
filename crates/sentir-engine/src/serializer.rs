//! Response rendering and parsing.
//!
//! [`render`] turns a `results`, `plugins` or `error` record into the body
//! the transport sends, together with the status and headers it should use.
//! [`parse`] is its inverse.
//!
//! ## Context handling
//!
//! The context is either embedded as `@context` or moved to a `Link`
//! header (`include_context = false` with a `context_uri`).
//!
//! ## Expansion and compaction
//!
//! Only keys are rewritten. A context contributes:
//!
//! - prefixes: string entries ending in `/` or `#` (`"marl": "http://...#"`)
//! - terms: entries whose `@id` (or string value) resolves to an absolute
//!   IRI through the prefixes, unless that CURIE is itself declared in the
//!   context
//!
//! Expansion maps terms and CURIEs to absolute IRIs. Compaction maps
//! absolute IRIs back, preferring a term over a CURIE.

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};

use sentir_core::{models, Error, Field, Params, Record, Result};

pub const JSONLD_CONTENT_TYPE: &str = "application/ld+json";
const JSONLD_CONTEXT_REL: &str = "http://www.w3.org/ns/json-ld#context";

/// How a document should be rendered.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Embed `@context` in the body.
    pub include_context: bool,
    /// Published context URI. Referenced from the body or from a `Link`
    /// header depending on `include_context`.
    pub context_uri: Option<String>,
    /// Shape to project the document onto.
    pub frame: Option<JsonValue>,
    /// Context to compact keys against.
    pub context: Option<JsonValue>,
    pub pretty: bool,
    /// Include every field, not only each kind's terse keys.
    pub verbose: bool,
    /// Emit absolute IRIs instead of CURIEs.
    pub expanded: bool,
    /// Emit alias names (`text`, `sentiments`, ...) instead of canonical
    /// keys.
    pub aliases: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_context: true,
            context_uri: None,
            frame: None,
            context: None,
            pretty: false,
            verbose: true,
            expanded: false,
            aliases: false,
        }
    }
}

impl RenderOptions {
    /// Options from resolved request parameters (`verbose`, `aliases`,
    /// `expanded-jsonld`, `in-headers`).
    pub fn from_params(params: &Params, context_uri: &str) -> Self {
        let flag = |key: &str| params.get(key).and_then(JsonValue::as_bool).unwrap_or(false);
        Self {
            include_context: !flag("in-headers"),
            context_uri: Some(context_uri.to_string()),
            verbose: params
                .get("verbose")
                .and_then(JsonValue::as_bool)
                .unwrap_or(true),
            expanded: flag("expanded-jsonld"),
            aliases: flag("aliases"),
            ..Self::default()
        }
    }

    pub fn with_frame(mut self, frame: JsonValue) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_context(mut self, context: JsonValue) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// A rendered document ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub body: String,
    pub status: u16,
    pub content_type: &'static str,
    /// `Link` header value when the context is not embedded.
    pub link: Option<String>,
}

/// Renders `record`. Error records carry their own status; everything
/// else renders as 200.
pub fn render(record: &Record, options: &RenderOptions) -> Result<Rendered> {
    let status = if record.type_name() == models::kind::ERROR {
        record
            .get_u64("status")
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(500)
    } else {
        200
    };

    let mut value = if options.aliases {
        aliased(record, options.verbose)
    } else {
        record.to_value_with(options.verbose)
    };

    if let Some(frame) = &options.frame {
        value = frame_value(value, frame);
    }

    let source = Context::from_value(
        record
            .context()
            .filter(|c| !c.is_string())
            .unwrap_or_else(|| models::base_context()),
    );
    if options.expanded {
        value = expand(&value, &source);
    } else if let Some(target) = &options.context {
        value = compact(&expand(&value, &source), &Context::from_value(target));
    }

    let mut link = None;
    if let JsonValue::Object(map) = &mut value {
        if options.include_context {
            let context = options
                .context
                .clone()
                .or_else(|| options.context_uri.clone().map(JsonValue::String))
                .or_else(|| record.context().cloned())
                .unwrap_or_else(|| models::base_context().clone());
            map.insert("@context".to_string(), context);
        } else if let Some(uri) = &options.context_uri {
            link = Some(format!(
                "<{}>; rel=\"{}\"; type=\"{}\"",
                uri, JSONLD_CONTEXT_REL, JSONLD_CONTENT_TYPE
            ));
        }
    }

    let body = if options.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(Rendered {
        body,
        status,
        content_type: JSONLD_CONTENT_TYPE,
        link,
    })
}

/// Renders an error through the same path as any other document.
pub fn render_error(err: &Error, options: &RenderOptions) -> Result<Rendered> {
    render(&err.to_record(), options)
}

/// Rebuilds a typed record from rendered text.
pub fn parse(text: &str) -> Result<Record> {
    let value: JsonValue = serde_json::from_str(text)?;
    Record::from_value(&value)
}

/// Rebuilds a typed record from text compacted against `context`.
pub fn parse_with_context(text: &str, context: &JsonValue) -> Result<Record> {
    let value: JsonValue = serde_json::from_str(text)?;
    let expanded = expand(&value, &Context::from_value(context));
    Record::from_value(&compact(&expanded, &Context::from_value(models::base_context())))
}

// =============================================================================
// Context
// =============================================================================

/// Prefix and term tables extracted from a JSON-LD context.
#[derive(Debug, Clone, Default)]
pub struct Context {
    prefixes: BTreeMap<String, String>,
    terms: BTreeMap<String, String>,
}

impl Context {
    /// Reads an inline context object (or a list of them). URIs contribute
    /// nothing.
    pub fn from_value(value: &JsonValue) -> Self {
        let mut ctx = Context::default();
        ctx.absorb(value);
        ctx
    }

    fn absorb(&mut self, value: &JsonValue) {
        match value {
            JsonValue::Array(items) => items.iter().for_each(|item| self.absorb(item)),
            JsonValue::Object(map) => {
                for (key, def) in map {
                    if key.starts_with('@') {
                        continue;
                    }
                    if let Some(iri) = def.as_str() {
                        if iri.ends_with('/') || iri.ends_with('#') {
                            self.prefixes.insert(key.clone(), iri.to_string());
                        }
                    }
                }
                for (key, def) in map {
                    if key.starts_with('@') || key.contains(':') || self.prefixes.contains_key(key) {
                        continue;
                    }
                    let target = match def {
                        JsonValue::String(s) => Some(s.as_str()),
                        JsonValue::Object(o) => o.get("@id").and_then(JsonValue::as_str),
                        _ => None,
                    };
                    let Some(target) = target else { continue };
                    if map.contains_key(target) {
                        continue;
                    }
                    let iri = self.expand_curie(target);
                    if iri.contains("://") {
                        self.terms.insert(key.clone(), iri);
                    }
                }
            }
            _ => {}
        }
    }

    fn expand_curie(&self, key: &str) -> String {
        if let Some((prefix, rest)) = key.split_once(':') {
            if !rest.starts_with("//") {
                if let Some(iri) = self.prefixes.get(prefix) {
                    return format!("{}{}", iri, rest);
                }
            }
        }
        key.to_string()
    }

    fn expand_key(&self, key: &str) -> String {
        if key.starts_with('@') {
            return key.to_string();
        }
        match self.terms.get(key) {
            Some(iri) => iri.clone(),
            None => self.expand_curie(key),
        }
    }

    fn compact_key(&self, key: &str) -> String {
        if !key.contains("://") {
            return key.to_string();
        }
        if let Some((term, _)) = self.terms.iter().find(|(_, iri)| iri.as_str() == key) {
            return term.clone();
        }
        self.prefixes
            .iter()
            .filter(|(_, iri)| key.starts_with(iri.as_str()) && key.len() > iri.len())
            .max_by_key(|(_, iri)| iri.len())
            .map(|(prefix, iri)| format!("{}:{}", prefix, &key[iri.len()..]))
            .unwrap_or_else(|| key.to_string())
    }
}

fn rewrite_keys(value: &JsonValue, f: &dyn Fn(&str) -> String) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut out = Map::new();
            for (key, v) in map {
                if key == "@context" {
                    out.insert(key.clone(), v.clone());
                } else {
                    out.insert(f(key), rewrite_keys(v, f));
                }
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(|v| rewrite_keys(v, f)).collect()),
        other => other.clone(),
    }
}

/// Rewrites terms and CURIE keys to absolute IRIs.
pub fn expand(value: &JsonValue, context: &Context) -> JsonValue {
    rewrite_keys(value, &|key| context.expand_key(key))
}

/// Rewrites absolute IRI keys to terms or CURIEs.
pub fn compact(value: &JsonValue, context: &Context) -> JsonValue {
    rewrite_keys(value, &|key| context.compact_key(key))
}

// =============================================================================
// Framing and aliases
// =============================================================================

/// Keeps only the keys named in `frame` (plus `@id` and `@type`). A
/// non-empty object under a frame key frames the nested value too.
pub fn frame_value(value: JsonValue, frame: &JsonValue) -> JsonValue {
    let Some(shape) = frame.as_object() else {
        return value;
    };
    match value {
        JsonValue::Array(items) => {
            JsonValue::Array(items.into_iter().map(|v| frame_value(v, frame)).collect())
        }
        JsonValue::Object(map) => {
            let mut out = Map::new();
            for (key, v) in map {
                if key == "@id" || key == "@type" {
                    out.insert(key, v);
                    continue;
                }
                match shape.get(&key) {
                    Some(sub) if sub.as_object().map_or(false, |o| !o.is_empty()) => {
                        out.insert(key, frame_value(v, sub));
                    }
                    Some(_) => {
                        out.insert(key, v);
                    }
                    None => {}
                }
            }
            JsonValue::Object(out)
        }
        other => other,
    }
}

fn aliased(record: &Record, verbose: bool) -> JsonValue {
    let JsonValue::Object(plain) = record.to_value_with(verbose) else {
        return JsonValue::Null;
    };
    let mut out = Map::new();
    for (key, value) in plain {
        let name = record
            .kind()
            .aliases()
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| key.clone());
        let value = match record.get(&key) {
            Some(field) => aliased_field(field, verbose, value),
            None => value,
        };
        out.insert(name, value);
    }
    JsonValue::Object(out)
}

fn aliased_field(field: &Field, verbose: bool, plain: JsonValue) -> JsonValue {
    match field {
        Field::Record(r) => aliased(r, verbose),
        Field::List(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| aliased_field(item, verbose, item.to_value_with(verbose)))
                .collect(),
        ),
        Field::Value(_) => plain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Record {
        let mut entry = models::entry("Hello");
        entry.set("@id", "http://example.org/doc#char=0,5");
        entry.push("marl:hasOpinion", models::sentiment("marl:Positive", Some(0.5)));
        let mut results = models::results();
        results.id();
        results.push("entries", entry);
        results
    }

    #[test]
    fn test_render_then_parse_round_trips() {
        let doc = sample();
        let rendered = render(&doc, &RenderOptions::default()).unwrap();
        assert_eq!(rendered.status, 200);
        assert!(rendered.link.is_none());

        let parsed = parse(&rendered.body).unwrap();
        assert_eq!(parsed.to_value(), doc.to_value());
        assert_eq!(parsed.type_name(), models::kind::RESULTS);
    }

    #[test]
    fn test_error_status_propagates() {
        let err = Error::invalid_params(vec![sentir_core::FieldError::new("input", "missing")], None);
        let rendered = render_error(&err, &RenderOptions::default()).unwrap();
        assert_eq!(rendered.status, 404);

        let rendered = render_error(&Error::NoValidAlgorithm, &RenderOptions::default()).unwrap();
        assert_eq!(rendered.status, 500);
        let back = Error::from_record(&parse(&rendered.body).unwrap()).unwrap();
        assert_eq!(back.message(), "No valid algorithm");
    }

    #[test]
    fn test_context_moves_to_link_header() {
        let options = RenderOptions {
            include_context: false,
            context_uri: Some("http://example.org/ctx.jsonld".into()),
            ..RenderOptions::default()
        };
        let rendered = render(&sample(), &options).unwrap();
        let body: JsonValue = serde_json::from_str(&rendered.body).unwrap();
        assert!(body.get("@context").is_none());
        assert_eq!(
            rendered.link.as_deref(),
            Some(
                "<http://example.org/ctx.jsonld>; rel=\"http://www.w3.org/ns/json-ld#context\"; \
                 type=\"application/ld+json\""
            )
        );
    }

    #[test]
    fn test_frame_projects_nested_shape() {
        let options = RenderOptions::default().with_frame(json!({
            "entries": {"nif:isString": {}}
        }));
        let rendered = render(&sample(), &options).unwrap();
        let body: JsonValue = serde_json::from_str(&rendered.body).unwrap();
        let entry = &body["entries"][0];
        assert_eq!(entry["nif:isString"], "Hello");
        assert!(entry.get("marl:hasOpinion").is_none());
        assert_eq!(entry["@type"], "entry");
        assert!(body.get("analysis").is_none());
    }

    #[test]
    fn test_expanded_keys_use_namespace_iris() {
        let options = RenderOptions {
            expanded: true,
            ..RenderOptions::default()
        };
        let rendered = render(&sample(), &options).unwrap();
        let body: JsonValue = serde_json::from_str(&rendered.body).unwrap();
        let entry = &body["entries"][0];
        assert!(entry
            .get("http://persistence.uni-leipzig.org/nlp2rdf/ontologies/nif-core#isString")
            .is_some());
        // Base-context terms that shadow declared CURIEs stay as they are.
        assert!(body.get("entries").is_some());
    }

    #[test]
    fn test_compaction_against_a_caller_context_round_trips() {
        let context = json!({
            "marl": "http://www.gsi.upm.es/ontologies/marl/ns#",
            "nif": "http://persistence.uni-leipzig.org/nlp2rdf/ontologies/nif-core#",
            "text": "nif:isString",
            "opinions": {"@id": "marl:hasOpinion"}
        });
        let doc = sample();
        let rendered = render(&doc, &RenderOptions::default().with_context(context.clone())).unwrap();
        let body: JsonValue = serde_json::from_str(&rendered.body).unwrap();
        assert_eq!(body["entries"][0]["text"], "Hello");
        assert!(body["entries"][0].get("opinions").is_some());

        let parsed = parse_with_context(&rendered.body, &context).unwrap();
        assert_eq!(parsed.to_value(), doc.to_value());
    }

    #[test]
    fn test_alias_view() {
        let options = RenderOptions {
            aliases: true,
            ..RenderOptions::default()
        };
        let rendered = render(&sample(), &options).unwrap();
        let body: JsonValue = serde_json::from_str(&rendered.body).unwrap();
        let entry = &body["entries"][0];
        assert_eq!(entry["text"], "Hello");
        assert_eq!(entry["sentiments"][0]["polarity"], "marl:Positive");
    }

    #[test]
    fn test_options_from_params() {
        let params = json!({"in-headers": true, "verbose": false, "expanded-jsonld": false})
            .as_object()
            .cloned()
            .unwrap();
        let options = RenderOptions::from_params(&params, "http://example.org/c");
        assert!(!options.include_context);
        assert!(!options.verbose);
        assert_eq!(options.context_uri.as_deref(), Some("http://example.org/c"));
    }
}
