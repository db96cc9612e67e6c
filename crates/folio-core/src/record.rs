//! # Records
//!
//! A [`Record`] is one schema-free row of a backing collection: an opaque id
//! plus an ordered map from field name to a tagged scalar [`Value`].
//!
//! Values keep their type so that sorting can compare numbers numerically
//! and timestamps chronologically, while filtering works over a canonical
//! string rendering ([`Value::as_text`]).

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name under which a record's id is visible to queries.
pub const ID_FIELD: &str = "id";

// =============================================================================
// Value
// =============================================================================

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Canonical string rendering used for substring matching and
    /// locale-ordered comparison. Null renders as the empty string.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Bool(true) => Cow::Borrowed("true"),
            Value::Bool(false) => Cow::Borrowed("false"),
            Value::Number(n) => Cow::Owned(format_number(*n)),
            Value::String(s) => Cow::Borrowed(s),
            Value::Timestamp(ts) => Cow::Owned(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

/// Integral values print without a fractional part (`2008`, not `2008.0`).
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// Type-aware ordering used by the sort stage.
///
/// A total order: values rank null < number < timestamp < text, and only
/// values of the same rank compare by content. Numbers use
/// [`f64::total_cmp`], timestamps compare chronologically, and booleans and
/// strings go through [`collate`] over their renderings.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        _ => match type_rank(a).cmp(&type_rank(b)) {
            Ordering::Equal => collate(&a.as_text(), &b.as_text()),
            unequal => unequal,
        },
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::Timestamp(_) => 2,
        Value::Bool(_) | Value::String(_) => 3,
    }
}

/// Locale-style string ordering: case-insensitive first, and on a tie the
/// lowercase form sorts ahead of the uppercase one (`"apple" < "Apple" < "banana"`).
pub fn collate(a: &str, b: &str) -> Ordering {
    let folded_a = a.chars().flat_map(char::to_lowercase);
    let folded_b = b.chars().flat_map(char::to_lowercase);
    folded_a.cmp(folded_b).then_with(|| b.cmp(a))
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Nested arrays and objects are not scalars; they are kept as their compact
/// JSON text so they still take part in free-text search.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

// =============================================================================
// Record
// =============================================================================

/// One row of a collection.
///
/// Serializes flat, with the id alongside the fields:
/// `{"id": "bk-ddd", "title": "Domain-Driven Design", "year": 2003}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The value a query sees for `field`.
    ///
    /// A declared field wins; otherwise `id` resolves to the record id and
    /// any other missing field is [`Value::Null`].
    pub fn value(&self, field: &str) -> Cow<'_, Value> {
        match self.fields.get(field) {
            Some(v) => Cow::Borrowed(v),
            None if field == ID_FIELD => Cow::Owned(Value::String(self.id.clone())),
            None => Cow::Owned(Value::Null),
        }
    }

    /// Every value visible to free-text search, id included.
    pub fn searchable_values(&self) -> impl Iterator<Item = Cow<'_, Value>> {
        let id = (!self.fields.contains_key(ID_FIELD))
            .then(|| Cow::Owned(Value::String(self.id.clone())));
        id.into_iter()
            .chain(self.fields.values().map(Cow::Borrowed))
    }
}
