//! Runtime form-data values.
//!
//! Form answers arrive from the rendering layer as an opaque JSON
//! object. Each answer is one of four scalar shapes; anything else
//! (nested arrays/objects) degrades to `Null` rather than erroring,
//! since the engine must never crash the surrounding form.
//!
//! All numeric values use `rust_decimal::Decimal` -- never `f64`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single form answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Number(Decimal),
    Bool(bool),
    Null,
}

impl Value {
    /// Returns a human-readable type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "Text",
            Value::Number(_) => "Number",
            Value::Bool(_) => "Bool",
            Value::Null => "Null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse a value from wire JSON. Non-scalar shapes degrade to Null.
    pub fn from_json(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match Decimal::from_str(&n.to_string()) {
                Ok(d) => Value::Number(d),
                Err(_) => {
                    tracing::debug!(number = %n, "numeric value out of Decimal range, treating as null");
                    Value::Null
                }
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => {
                tracing::debug!(got = other.to_string(), "non-scalar form value, treating as null");
                Value::Null
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(s) => serde_json::Value::String(s.clone()),
            // emit a JSON number, not the string form Decimal's serde
            // feature would produce
            Value::Number(d) => serde_json::Number::from_f64(d.to_f64().unwrap_or(0.0))
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Null => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(d) => write!(f, "{}", d.normalize()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => Ok(()),
        }
    }
}

/// A snapshot of form answers, keyed by field name.
///
/// Iteration follows first-insertion order so that anything observable
/// derived from a walk over the snapshot is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    names: Vec<String>,
    entries: BTreeMap<String, Value>,
}

impl FormData {
    pub fn new() -> FormData {
        FormData::default()
    }

    /// Insert or replace an answer. A replaced field keeps its
    /// original position in iteration order.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if !self.entries.contains_key(&name) {
            self.names.push(name.clone());
        }
        self.entries.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate answers in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names
            .iter()
            .filter_map(|n| self.entries.get(n).map(|v| (n.as_str(), v)))
    }

    /// Field names present in the snapshot, in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Parse a snapshot from wire JSON. A non-object payload yields an
    /// empty snapshot.
    pub fn from_json(v: &serde_json::Value) -> FormData {
        let mut data = FormData::new();
        let Some(obj) = v.as_object() else {
            if !v.is_null() {
                tracing::debug!(got = v.to_string(), "form data is not a JSON object");
            }
            return data;
        };
        for (name, raw) in obj {
            data.insert(name.clone(), Value::from_json(raw));
        }
        data
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        for (name, value) in self.iter() {
            obj.insert(name.to_string(), value.to_json());
        }
        serde_json::Value::Object(obj)
    }
}
