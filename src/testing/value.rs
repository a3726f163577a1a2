//! Dynamically typed values exchanged between suites, drivers and the tester

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key marking a function literal in YAML/JSON input
const FUNCTION_KEY: &str = "$function";
/// Key carrying the class name of a non-plain object in YAML/JSON input
const CLASS_KEY: &str = "$class";

/// A value as seen by an assertion
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// A callable, known only by its source text
    Function(String),
    /// A plain key/value object
    Object(BTreeMap<String, Value>),
    /// An object of some other class (e.g. `Date`, `RegExp`)
    Instance {
        class: String,
        fields: BTreeMap<String, Value>,
    },
}

impl Value {
    /// Refined type tag
    ///
    /// Built-in kinds are lowercase. Instances report their class name as
    /// given, so a `Date` and a plain object never share a tag.
    pub fn type_name(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Array(_) => "array".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::Object(_) => "object".to_string(),
            Value::Instance { class, .. } => class.clone(),
        }
    }

    /// True only for the boolean `true`
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// Serialized form used in assertion comments
    pub fn serialize_to_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Function(source) => source.clone(),
            other => serde_json::to_string(other).unwrap_or_else(|_| format!("{:?}", other)),
        }
    }

    /// Build a function value from its source text
    pub fn function(source: impl Into<String>) -> Self {
        Value::Function(source.into())
    }

    /// Build a class instance from its fields
    pub fn instance<I, K>(class: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Instance {
            class: class.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Build a plain object from its fields
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => f.write_str(&other.serialize_to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(mut map) => {
                if map.len() == 1 {
                    if let Some(serde_json::Value::String(source)) = map.get(FUNCTION_KEY) {
                        return Value::Function(source.clone());
                    }
                }
                match map.remove(CLASS_KEY) {
                    Some(serde_json::Value::String(class)) => Value::Instance {
                        class,
                        fields: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
                    },
                    Some(other) => {
                        map.insert(CLASS_KEY.to_string(), other);
                        Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
                    }
                    None => {
                        Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
                    }
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Function(source) => serializer.serialize_str(source),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) | Value::Instance { fields, .. } => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
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
        Value::Number(n as f64)
    }
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

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
