//! Loosely typed values used for driver-specific metadata (`dbSpecific`).

use serde::{Deserialize, Serialize};

use super::rule::{DateTime, Decimal};
use super::wire::int_str;

/// A keyed value, one field of a [`ValueStruct`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Value {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
}

impl Value {
    pub fn new(key: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            kind: Some(kind),
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    Null,
    Int32(i32),
    Uint32(u32),
    Int64(#[serde(with = "int_str")] i64),
    Uint64(#[serde(with = "int_str")] u64),
    Float(f32),
    Double(f64),
    String(String),
    Bool(bool),
    Decimal(Decimal),
    Uuid(Uuid),
    Datetime(DateTime),
    Struct(ValueStruct),
    List(ValueList),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uuid {
    pub value: uuid::Uuid,
}

/// Ordered set of keyed values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueStruct {
    #[serde(default)]
    pub fields: Vec<Value>,
}

impl ValueStruct {
    /// First field with the given key.
    pub fn get(&self, key: &str) -> Option<&ValueKind> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .and_then(|f| f.kind.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueList {
    #[serde(default)]
    pub values: Vec<Value>,
}
