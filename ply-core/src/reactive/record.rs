//! Record Values
//!
//! A Record is the object-shaped state held by an atom: an ordered map from
//! field name to JSON value. Layers stack fields on top of each other with a
//! shallow merge, so the only operation that really matters here is
//! [`Record::merged`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AtomError;

/// Object state held by an atom.
///
/// Field order follows insertion order. Equality ignores order, so two
/// records with the same fields compare equal no matter how they were built.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Get a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field, returning the previous value if any.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Whether `field` is present.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Shallow merge: every field of `derived` overwrites the same field of
    /// `self`, all other fields of `self` pass through untouched.
    ///
    /// Overwritten fields keep their original position.
    pub fn merged(mut self, derived: Record) -> Record {
        self.0.extend(derived.0);
        self
    }

    /// Convert into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0.into_iter().collect::<Map<String, Value>>())
    }
}

impl TryFrom<Value> for Record {
    type Error = AtomError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(AtomError::NotAnObject {
                found: kind_name(&other),
            }),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn merge_prefers_derived_fields() {
        let base = record(json!({"a": 1, "b": 2}));
        let derived = record(json!({"b": 20, "c": 3}));

        let merged = base.merged(derived);
        assert_eq!(merged, record(json!({"a": 1, "b": 20, "c": 3})));
    }

    #[test]
    fn merge_keeps_original_field_order() {
        let base = record(json!({"a": 1, "b": 2}));
        let merged = base.merged(Record::new().with("c", 3).with("a", 10));

        let keys: Vec<_> = merged.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let base = record(json!({"a": 1}));
        assert_eq!(base.clone().merged(Record::new()), base);
    }

    #[test]
    fn non_objects_are_rejected() {
        let err = Record::try_from(json!([1, 2])).unwrap_err();
        assert!(matches!(err, AtomError::NotAnObject { found: "array" }));
    }

    #[test]
    fn converts_back_to_value() {
        let value = json!({"name": "ply", "layers": 3});
        assert_eq!(record(value.clone()).into_value(), value);
    }
}
