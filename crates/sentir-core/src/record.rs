//! Schema-backed records.
//!
//! A [`Record`] is a string-keyed map of [`Field`]s whose shape is declared
//! by a shared [`RecordKind`]: a type name, default values, alias views over
//! other keys and an optional compiled JSON Schema. Every domain object
//! (entries, sentiments, emotion sets, plugins, errors, responses) is a
//! record of some kind.
//!
//! Keys are normalised on every access:
//!
//! - `ns__name` and `ns:name` address the same slot
//! - declared aliases (`text` for `nif:isString`) resolve to their target key
//! - keys starting with `_` (and the names `schema` and `context`) are
//!   internal: kept beside the data, never iterated or serialized
//!
//! Setting `@id` resolves the identifier against the record's base and
//! setting `@context` resolves a context object stored out of band. Setting
//! any key to `null` removes it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::schema::CompiledSchema;

pub const ID_KEY: &str = "@id";
pub const TYPE_KEY: &str = "@type";
pub const CONTEXT_KEY: &str = "@context";

const BASE_KEY: &str = "_base";

/// A value stored in a record.
#[derive(Debug, Clone)]
pub enum Field {
    Value(JsonValue),
    Record(Record),
    List(Vec<Field>),
}

impl Field {
    /// Plain JSON for this field, nested records included.
    pub fn to_value(&self) -> JsonValue {
        self.to_value_with(true)
    }

    pub fn to_value_with(&self, verbose: bool) -> JsonValue {
        match self {
            Field::Value(v) => v.clone(),
            Field::Record(r) => r.to_value_with(verbose),
            Field::List(items) => {
                JsonValue::Array(items.iter().map(|f| f.to_value_with(verbose)).collect())
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Value(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Value(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Field::Value(v) => v.as_u64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Field::Value(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Field::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Field::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Field]> {
        match self {
            Field::List(items) => Some(items),
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Field::Value(JsonValue::Null))
    }

    /// Turns a plain JSON array into a list so records can be pushed into it.
    fn into_list(self) -> Vec<Field> {
        match self {
            Field::List(items) => items,
            Field::Value(JsonValue::Array(items)) => items.into_iter().map(Field::Value).collect(),
            other => vec![other],
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

impl From<JsonValue> for Field {
    fn from(v: JsonValue) -> Self {
        Field::Value(v)
    }
}

impl From<Record> for Field {
    fn from(r: Record) -> Self {
        Field::Record(r)
    }
}

impl From<Vec<Record>> for Field {
    fn from(records: Vec<Record>) -> Self {
        Field::List(records.into_iter().map(Field::Record).collect())
    }
}

impl From<Vec<Field>> for Field {
    fn from(items: Vec<Field>) -> Self {
        Field::List(items)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Value(JsonValue::String(s.to_string()))
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Value(JsonValue::String(s))
    }
}

impl From<f64> for Field {
    fn from(n: f64) -> Self {
        Field::Value(JsonValue::from(n))
    }
}

impl From<i64> for Field {
    fn from(n: i64) -> Self {
        Field::Value(JsonValue::from(n))
    }
}

impl From<u64> for Field {
    fn from(n: u64) -> Self {
        Field::Value(JsonValue::from(n))
    }
}

impl From<bool> for Field {
    fn from(b: bool) -> Self {
        Field::Value(JsonValue::Bool(b))
    }
}

/// A declared alias view: reading or writing `name` addresses `key`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAlias {
    pub name: String,
    pub key: String,
    /// Value installed under `key` when a record is created.
    pub default: Option<JsonValue>,
}

/// Declared shape shared by every record of one type.
#[derive(Debug)]
pub struct RecordKind {
    type_name: String,
    defaults: Vec<(String, JsonValue)>,
    aliases: Vec<FieldAlias>,
    terse: Vec<String>,
    schema: Option<CompiledSchema>,
}

impl RecordKind {
    pub fn builder(type_name: impl Into<String>) -> RecordKindBuilder {
        RecordKindBuilder::new(type_name)
    }

    /// Kind used for objects whose `@type` is unknown or absent.
    pub fn generic() -> Arc<RecordKind> {
        Arc::new(RecordKind {
            type_name: "record".to_string(),
            defaults: Vec::new(),
            aliases: vec![id_alias()],
            terse: Vec::new(),
            schema: None,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn aliases(&self) -> &[FieldAlias] {
        &self.aliases
    }

    pub fn defaults(&self) -> &[(String, JsonValue)] {
        &self.defaults
    }

    pub fn schema(&self) -> Option<&CompiledSchema> {
        self.schema.as_ref()
    }

    /// Storage key for `key` after alias and namespace normalisation.
    pub fn canonical_key(&self, key: &str) -> String {
        if is_internal(key) {
            return key.to_string();
        }
        if let Some(alias) = self.aliases.iter().find(|a| a.name == key) {
            return alias.key.clone();
        }
        if !key.starts_with('@') && key.contains("__") {
            return key.replacen("__", ":", 1);
        }
        key.to_string()
    }
}

fn id_alias() -> FieldAlias {
    FieldAlias {
        name: "id".to_string(),
        key: ID_KEY.to_string(),
        default: None,
    }
}

fn is_internal(key: &str) -> bool {
    key.starts_with('_') || key == "schema" || key == "context"
}

/// Builder for [`RecordKind`]. Replaces per-type boilerplate with one
/// declarative registration step.
#[derive(Debug, Clone)]
pub struct RecordKindBuilder {
    type_name: String,
    defaults: Vec<(String, JsonValue)>,
    aliases: Vec<FieldAlias>,
    terse: Vec<String>,
    schema: Option<JsonValue>,
}

impl RecordKindBuilder {
    fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            defaults: Vec::new(),
            aliases: Vec::new(),
            terse: Vec::new(),
            schema: None,
        }
    }

    /// Inherit defaults, aliases, terse keys and schema from `parent`.
    /// Declarations made on this builder take precedence.
    pub fn extends(mut self, parent: &RecordKind) -> Self {
        for (key, value) in &parent.defaults {
            if key != TYPE_KEY && !self.defaults.iter().any(|(k, _)| k == key) {
                self.defaults.push((key.clone(), value.clone()));
            }
        }
        for alias in &parent.aliases {
            if !self.aliases.iter().any(|a| a.name == alias.name) {
                self.aliases.push(alias.clone());
            }
        }
        for key in &parent.terse {
            if !self.terse.contains(key) {
                self.terse.push(key.clone());
            }
        }
        if self.schema.is_none() {
            self.schema = parent.schema.as_ref().map(|s| s.source().clone());
        }
        self
    }

    pub fn default(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        let key = key.into();
        self.defaults.retain(|(k, _)| *k != key);
        self.defaults.push((key, value));
        self
    }

    pub fn alias(self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.push_alias(name.into(), key.into(), None)
    }

    pub fn alias_with_default(
        self,
        name: impl Into<String>,
        key: impl Into<String>,
        default: JsonValue,
    ) -> Self {
        self.push_alias(name.into(), key.into(), Some(default))
    }

    fn push_alias(mut self, name: String, key: String, default: Option<JsonValue>) -> Self {
        self.aliases.retain(|a| a.name != name);
        self.aliases.push(FieldAlias { name, key, default });
        self
    }

    /// Keys kept by terse (non-verbose) serialization.
    pub fn terse(mut self, keys: &[&str]) -> Self {
        for key in keys {
            if !self.terse.iter().any(|k| k == key) {
                self.terse.push(key.to_string());
            }
        }
        self
    }

    pub fn schema(mut self, schema: JsonValue) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Validates the declaration and compiles the schema.
    ///
    /// Empty or internal key names and malformed schemas are configuration
    /// errors; they surface at registration, never per request.
    pub fn build(self) -> Result<Arc<RecordKind>> {
        if self.type_name.trim().is_empty() {
            return Err(Error::Configuration("record kind without a type name".into()));
        }

        let mut bad = Vec::new();
        for (key, _) in &self.defaults {
            if key.is_empty() || is_internal(key) {
                bad.push(format!("default '{}'", key));
            }
        }
        for alias in &self.aliases {
            if alias.name.is_empty() || alias.key.is_empty() || is_internal(&alias.key) {
                bad.push(format!("alias '{}' -> '{}'", alias.name, alias.key));
            }
        }
        if !bad.is_empty() {
            return Err(Error::Configuration(format!(
                "invalid keys in record kind '{}': {}",
                self.type_name,
                bad.join(", ")
            )));
        }

        let schema = self.schema.map(CompiledSchema::compile).transpose()?;

        let mut aliases = self.aliases;
        if !aliases.iter().any(|a| a.name == "id") {
            aliases.push(id_alias());
        }

        let mut kind = RecordKind {
            type_name: self.type_name,
            defaults: Vec::new(),
            aliases,
            terse: self.terse,
            schema,
        };

        let mut defaults = vec![(TYPE_KEY.to_string(), JsonValue::String(kind.type_name.clone()))];
        let mut push_default = |key: String, value: JsonValue, overwrite: bool| {
            match defaults.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) if overwrite => slot.1 = value,
                Some(_) => {}
                None => defaults.push((key, value)),
            }
        };
        if let Some(schema) = &kind.schema {
            for (key, value) in schema.property_defaults() {
                push_default(kind.canonical_key(&key), value, false);
            }
        }
        for alias in &kind.aliases {
            if let Some(default) = &alias.default {
                push_default(alias.key.clone(), default.clone(), true);
            }
        }
        for (key, value) in self.defaults {
            push_default(kind.canonical_key(&key), value, true);
        }
        kind.defaults = defaults;

        Ok(Arc::new(kind))
    }
}

/// Lookup table from type names to kinds.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: HashMap<String, Arc<RecordKind>>,
    generic: Arc<RecordKind>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KindRegistry {
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
            generic: RecordKind::generic(),
        }
    }

    /// Registers a kind. Two kinds with the same type name are a
    /// configuration error.
    pub fn register(&mut self, kind: Arc<RecordKind>) -> Result<()> {
        let name = kind.type_name().to_string();
        if self.kinds.contains_key(&name) {
            return Err(Error::Configuration(format!(
                "record kind '{}' registered twice",
                name
            )));
        }
        self.kinds.insert(name, kind);
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<RecordKind>> {
        self.kinds.get(type_name).cloned()
    }

    pub fn generic(&self) -> Arc<RecordKind> {
        self.generic.clone()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// A typed, self-describing map of fields.
#[derive(Clone)]
pub struct Record {
    kind: Arc<RecordKind>,
    data: BTreeMap<String, Field>,
    internal: BTreeMap<String, JsonValue>,
    context: Option<JsonValue>,
}

impl Record {
    /// Creates a record with a fresh deep copy of every kind default.
    pub fn new(kind: &Arc<RecordKind>) -> Self {
        let mut record = Self {
            kind: kind.clone(),
            data: BTreeMap::new(),
            internal: BTreeMap::new(),
            context: None,
        };
        for (key, value) in &kind.defaults {
            record.set(key, value.clone());
        }
        record
    }

    /// Creates a record from defaults, then `initial`, then `overrides`.
    pub fn with_data<I, O>(kind: &Arc<RecordKind>, initial: I, overrides: O) -> Self
    where
        I: IntoIterator<Item = (String, JsonValue)>,
        O: IntoIterator<Item = (String, Field)>,
    {
        let mut record = Self::new(kind);
        for (key, value) in initial {
            record.set(&key, value);
        }
        for (key, value) in overrides {
            record.set(&key, value);
        }
        record
    }

    /// Rebuilds a record from plain JSON using the built-in kinds.
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        Self::from_value_in(value, crate::models::kinds())
    }

    /// Rebuilds a record from plain JSON, typing nested objects by `@type`.
    pub fn from_value_in(value: &JsonValue, registry: &KindRegistry) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Serialization("expected a JSON object".to_string()))?;

        let kind = match type_of(obj) {
            Some(type_name) => registry.get(type_name).unwrap_or_else(|| {
                warn!(record_type = type_name, "Unknown record type, using generic record");
                registry.generic()
            }),
            None => registry.generic(),
        };

        let mut record = Record::new(&kind);
        for (key, value) in obj {
            match key.as_str() {
                CONTEXT_KEY => record.set_context(value.clone()),
                ID_KEY => {
                    record
                        .data
                        .insert(ID_KEY.to_string(), Field::Value(value.clone()));
                }
                _ => {
                    let field = field_from_value(value, registry)?;
                    record.set(key, field);
                }
            }
        }
        Ok(record)
    }

    pub fn kind(&self) -> &Arc<RecordKind> {
        &self.kind
    }

    /// The `@type` value, falling back to the declared kind.
    pub fn type_name(&self) -> &str {
        self.data
            .get(TYPE_KEY)
            .and_then(Field::as_str)
            .unwrap_or_else(|| self.kind.type_name())
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        let key = self.kind.canonical_key(key);
        if is_internal(&key) {
            return None;
        }
        self.data.get(&key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Field> {
        let key = self.kind.canonical_key(key);
        if is_internal(&key) {
            return None;
        }
        self.data.get_mut(&key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Field::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Field::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Field::as_u64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Field::as_bool)
    }

    /// Records held under `key`, whether stored as a list or a single record.
    pub fn records(&self, key: &str) -> Vec<&Record> {
        match self.get(key) {
            Some(Field::Record(r)) => vec![r],
            Some(Field::List(items)) => items.iter().filter_map(Field::as_record).collect(),
            _ => Vec::new(),
        }
    }

    pub fn records_mut(&mut self, key: &str) -> Vec<&mut Record> {
        match self.get_mut(key) {
            Some(Field::Record(r)) => vec![r],
            Some(Field::List(items)) => items.iter_mut().filter_map(Field::as_record_mut).collect(),
            _ => Vec::new(),
        }
    }

    /// Stores `value` under the canonical form of `key`. A `null` value
    /// removes the key instead.
    pub fn set(&mut self, key: &str, value: impl Into<Field>) {
        let key = self.kind.canonical_key(key);
        let value = value.into();

        if is_internal(&key) {
            if value.is_null() {
                self.internal.remove(&key);
            } else {
                self.internal.insert(key, value.to_value());
            }
            return;
        }
        if value.is_null() {
            self.data.remove(&key);
            return;
        }

        if key == ID_KEY {
            let raw = match value {
                Field::Value(JsonValue::String(raw)) => raw,
                Field::Value(JsonValue::Number(n)) => n.to_string(),
                _ => {
                    warn!(record_type = self.type_name(), "Ignoring non-string @id");
                    return;
                }
            };
            let id = self.resolve_id(&raw);
            self.data.insert(key, Field::from(id));
        } else if key == CONTEXT_KEY {
            self.set_context(value.to_value());
        } else {
            self.data.insert(key, value);
        }
    }

    /// Chaining form of [`Record::set`].
    pub fn with(mut self, key: &str, value: impl Into<Field>) -> Self {
        self.set(key, value);
        self
    }

    /// Appends to the list under `key`, converting a scalar or plain array.
    pub fn push(&mut self, key: &str, value: impl Into<Field>) {
        let key = self.kind.canonical_key(key);
        let value = value.into();
        if is_internal(&key) {
            let mut items = match self.internal.remove(&key) {
                Some(JsonValue::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            };
            items.push(value.to_value());
            self.internal.insert(key, JsonValue::Array(items));
            return;
        }
        let mut items = self.data.remove(&key).map(Field::into_list).unwrap_or_default();
        items.push(value);
        self.data.insert(key, Field::List(items));
    }

    /// Removes `key`, returning the previous value.
    pub fn remove(&mut self, key: &str) -> Option<Field> {
        let key = self.kind.canonical_key(key);
        if is_internal(&key) {
            return self.internal.remove(&key).map(Field::Value);
        }
        self.data.remove(&key)
    }

    /// Visible keys in storage order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get_internal(&self, key: &str) -> Option<&JsonValue> {
        self.internal.get(key)
    }

    pub fn set_internal(&mut self, key: &str, value: JsonValue) {
        let key = if is_internal(key) {
            key.to_string()
        } else {
            format!("_{}", key)
        };
        self.internal.insert(key, value);
    }

    /// Base used to qualify relative identifiers.
    pub fn set_base(&mut self, base: impl Into<String>) {
        self.internal
            .insert(BASE_KEY.to_string(), JsonValue::String(base.into()));
    }

    fn base(&self) -> &str {
        self.internal
            .get(BASE_KEY)
            .and_then(JsonValue::as_str)
            .filter(|b| !b.is_empty())
            .unwrap_or(defaults::ID_PREFIX)
    }

    fn resolve_id(&self, raw: &str) -> String {
        if raw.contains(':') {
            raw.to_string()
        } else {
            format!("{}{}", self.base(), raw)
        }
    }

    /// Identifier of the record, generating `prefix:{type}_{uuid}` on
    /// first use.
    pub fn id(&mut self) -> String {
        if let Some(id) = self.get_str(ID_KEY) {
            return id.to_string();
        }
        let id = format!("{}{}_{}", self.base(), self.type_name(), Uuid::now_v7());
        self.data.insert(ID_KEY.to_string(), Field::from(id.clone()));
        id
    }

    /// Identifier if one has been set.
    pub fn id_ref(&self) -> Option<&str> {
        self.get_str(ID_KEY)
    }

    pub fn context(&self) -> Option<&JsonValue> {
        self.context.as_ref()
    }

    /// Resolves and stores a JSON-LD context.
    ///
    /// Objects are kept as given, lists are resolved element-wise, a string
    /// naming a readable JSON file is loaded, any other string is kept as a
    /// URI.
    pub fn set_context(&mut self, context: JsonValue) {
        self.context = match context {
            JsonValue::Null => None,
            other => Some(resolve_context(other)),
        };
    }

    pub fn take_context(&mut self) -> Option<JsonValue> {
        self.context.take()
    }

    /// Checks the record against its kind's schema, reporting every
    /// violation at once.
    pub fn validate(&self) -> Result<()> {
        let Some(schema) = self.kind.schema() else {
            return Ok(());
        };
        schema
            .validate(&self.to_value())
            .map_err(|errors| Error::Validation {
                message: format!("Invalid {}", self.type_name()),
                errors,
                parameters: None,
            })
    }

    /// Plain JSON with every nested record unwrapped.
    pub fn to_value(&self) -> JsonValue {
        self.to_value_with(true)
    }

    /// Plain JSON; terse output keeps only `@id`, `@type` and the kind's
    /// terse keys.
    pub fn to_value_with(&self, verbose: bool) -> JsonValue {
        let mut map = Map::new();
        for (key, field) in &self.data {
            if !verbose
                && key != ID_KEY
                && key != TYPE_KEY
                && !self.kind.terse.iter().any(|k| k == key)
            {
                continue;
            }
            map.insert(key.clone(), field.to_value_with(verbose));
        }
        JsonValue::Object(map)
    }
}

fn type_of(obj: &Map<String, JsonValue>) -> Option<&str> {
    match obj.get(TYPE_KEY)? {
        JsonValue::String(s) => Some(s.as_str()),
        JsonValue::Array(types) => types.iter().find_map(JsonValue::as_str),
        _ => None,
    }
}

fn field_from_value(value: &JsonValue, registry: &KindRegistry) -> Result<Field> {
    match value {
        JsonValue::Object(obj) if obj.contains_key(TYPE_KEY) => {
            Ok(Field::Record(Record::from_value_in(value, registry)?))
        }
        JsonValue::Array(items)
            if items
                .iter()
                .any(|i| i.as_object().map_or(false, |o| o.contains_key(TYPE_KEY))) =>
        {
            let fields = items
                .iter()
                .map(|i| field_from_value(i, registry))
                .collect::<Result<Vec<_>>>()?;
            Ok(Field::List(fields))
        }
        other => Ok(Field::Value(other.clone())),
    }
}

fn resolve_context(context: JsonValue) -> JsonValue {
    match context {
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(resolve_context).collect()),
        JsonValue::String(uri) => {
            let path = Path::new(&uri);
            if !path.is_file() {
                return JsonValue::String(uri);
            }
            match std::fs::read_to_string(path)
                .map_err(Error::from)
                .and_then(|text| serde_json::from_str::<JsonValue>(&text).map_err(Error::from))
            {
                Ok(JsonValue::Object(mut doc)) => match doc.remove(CONTEXT_KEY) {
                    Some(inner) => inner,
                    None => JsonValue::Object(doc),
                },
                Ok(other) => other,
                Err(e) => {
                    warn!(context = %uri, error = %e, "Could not load context file, keeping URI");
                    JsonValue::String(uri)
                }
            }
        }
        other => other,
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.type_name())
            .field("data", &self.data)
            .finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self.to_value()) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
