//! Property values.
//!
//! A `Value` is what a property accessor reads and writes. Scalars cover the
//! attribute case; relationships are stored as identifiers (`Object` for a
//! to-one arc, `Objects` for a to-many collection) so that related objects are
//! always resolved through a registry rather than owned. `Fault` marks a
//! relationship that has not been loaded yet.

use crate::id::{KeyValue, ObjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lazy-placeholder marker observed in place of a relationship value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fault {
    ToOne,
    ToMany,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    /// Target of a to-one relationship.
    Object(ObjectId),
    /// Backing collection of a to-many relationship.
    Objects(Vec<ObjectId>),
    Fault(Fault),
}

/// Conversion failure between `Value` and a concrete Rust type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("expected {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Object(_) => "object",
            Value::Objects(_) => "objects",
            Value::Fault(_) => "fault",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Value::Fault(_))
    }

    /// Null and faults both mean "nothing materialized here".
    pub fn is_absent(&self) -> bool {
        self.is_null() || self.is_fault()
    }

    pub fn as_object(&self) -> Option<&ObjectId> {
        match self {
            Value::Object(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_objects(&self) -> Option<&[ObjectId]> {
        match self {
            Value::Objects(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.kind_name(),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! scalar_conversions {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = ValueError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(other.mismatch($name)),
                    }
                }
            }

            impl TryFrom<Value> for Option<$ty> {
                type Error = ValueError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::Null => Ok(None),
                        Value::$variant(v) => Ok(Some(v)),
                        other => Err(other.mismatch($name)),
                    }
                }
            }
        )*
    };
}

scalar_conversions! {
    bool => Bool, "bool";
    i64 => Int, "int";
    f64 => Float, "float";
    String => Text, "text";
    Vec<u8> => Bytes, "bytes";
    DateTime<Utc> => Timestamp, "timestamp";
    ObjectId => Object, "object";
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Option<ObjectId>> for Value {
    fn from(value: Option<ObjectId>) -> Self {
        value.map(Value::Object).unwrap_or(Value::Null)
    }
}

impl From<Vec<ObjectId>> for Value {
    fn from(value: Vec<ObjectId>) -> Self {
        Value::Objects(value)
    }
}

impl From<KeyValue> for Value {
    fn from(value: KeyValue) -> Self {
        match value {
            KeyValue::Int(v) => Value::Int(v),
            KeyValue::Text(v) => Value::Text(v),
            KeyValue::Bytes(v) => Value::Bytes(v),
        }
    }
}

impl TryFrom<Value> for KeyValue {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(v) => Ok(KeyValue::Int(v)),
            Value::Text(v) => Ok(KeyValue::Text(v)),
            Value::Bytes(v) => Ok(KeyValue::Bytes(v)),
            other => Err(other.mismatch("key")),
        }
    }
}

/// Unloaded or null collections read as empty.
impl TryFrom<Value> for Vec<ObjectId> {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Objects(ids) => Ok(ids),
            Value::Null | Value::Fault(Fault::ToMany) => Ok(Vec::new()),
            other => Err(other.mismatch("objects")),
        }
    }
}
