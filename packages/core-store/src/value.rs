//! The Value type - the closed set of primitives a store can hold.
//!
//! Every bridge in the stack terminates in this set. Stores never see
//! native application types, only these shapes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A primitive value that can be read from or written to a `RawStore`.
///
/// # Design Notes
///
/// - Uses `BTreeMap` for deterministic ordering (important for comparison and persistence)
/// - Integers are `i64`; `Unsigned` only carries values above `i64::MAX`
/// - `Null` is an element marker inside containers. Writing `Null` at the
///   top level of a store removes the key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent element inside a container.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Unsigned 64-bit integer too large for `Integer`.
    Unsigned(u64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Binary blob.
    Bytes(Vec<u8>),
    /// Point in time.
    Date(DateTime<Utc>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// String-keyed map of values.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Store an unsigned integer, using `Integer` whenever it fits.
    pub fn unsigned(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Unsigned(v),
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in mismatch diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Unsigned(_) => "unsigned",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of the value.
    ///
    /// Floats with no fractional part are accepted, which is the coercion
    /// a store applies when a number was written as a float.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Unsigned(u) => i64::try_from(*u).ok(),
            Value::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    /// Unsigned view of the value. Negative integers do not convert.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(i) => u64::try_from(*i).ok(),
            Value::Unsigned(u) => Some(*u),
            Value::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64 => {
                Some(*f as u64)
            }
            _ => None,
        }
    }

    /// Floating point view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::Unsigned(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::unsigned(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(v: BTreeMap<String, T>) -> Self {
        Value::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;

    #[test]
    fn unsigned_prefers_integer() {
        assert_eq!(Value::unsigned(42), Value::Integer(42));
        assert_eq!(Value::unsigned(u64::MAX), Value::Unsigned(u64::MAX));
        assert_eq!(Value::from(i64::MAX as u64), Value::Integer(i64::MAX));
    }

    #[test]
    fn numeric_views_coerce() {
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(3.5).as_i64(), None);
        assert_eq!(Value::Integer(-1).as_u64(), None);
        assert_eq!(Value::Unsigned(u64::MAX).as_i64(), None);
        assert_eq!(Value::Unsigned(u64::MAX).as_u64(), Some(u64::MAX));
        assert_eq!(Value::Integer(2).as_f64(), Some(2.0));
        assert_eq!(Value::String("2".into()).as_f64(), None);
    }

    #[test]
    fn container_conversions() {
        let value = Value::from(vec!["a", "b"]);
        assert_eq!(
            value.as_array(),
            Some(&[Value::from("a"), Value::from("b")][..])
        );

        let map: BTreeMap<String, i64> = btree! {
            "one".to_string() => 1,
            "two".to_string() => 2,
        };
        let value = Value::from(map);
        assert!(matches!(value, Value::Map(_)));
        assert_eq!(value.as_map().and_then(|m| m.get("two")), Some(&Value::Integer(2)));
    }

    #[test]
    fn kind_names_are_distinct() {
        let values = [
            Value::Null,
            Value::Bool(true),
            Value::Integer(1),
            Value::Unsigned(u64::MAX),
            Value::Float(1.5),
            Value::from("s"),
            Value::Bytes(vec![1]),
            Value::Date(Utc::now()),
            Value::Array(Vec::new()),
            Value::Map(BTreeMap::new()),
        ];
        let names: std::collections::BTreeSet<_> = values.iter().map(Value::kind_name).collect();
        assert_eq!(names.len(), values.len());
    }

    #[test]
    fn serde_roundtrip_keeps_variants() {
        let value = Value::Map(btree! {
            "blob".to_string() => Value::Bytes(vec![0, 255]),
            "big".to_string() => Value::Unsigned(u64::MAX),
            "list".to_string() => Value::from(vec![1i64, 2, 3]),
        });

        let json = serde_json::to_string(&value).unwrap();
        let recovered: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, value);
    }
}
