//! Core value types for filter fields.
//!
//! A field holds a typed [`FieldValue`] in memory and is persisted as a
//! [`PrimitiveValue`]: a single string or a list of strings, the shapes a
//! URL query string can carry.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Field name used as the key in every map.
pub type FieldName = String;

/// Persisted values keyed by field name, in insertion order.
///
/// A missing key stands for `null`/absent.
pub type PrimitiveMap = IndexMap<FieldName, PrimitiveValue>;

/// Typed values keyed by field name. `Null` values are never present.
pub type ValueMap = IndexMap<FieldName, FieldValue>;

/// The wire form of a field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimitiveValue {
    Single(String),
    Many(Vec<String>),
}

impl PrimitiveValue {
    /// View the primitive as a list; a single value is a one-element list.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            PrimitiveValue::Single(value) => vec![value.as_str()],
            PrimitiveValue::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// First string of the primitive, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            PrimitiveValue::Single(value) => Some(value),
            PrimitiveValue::Many(values) => values.first().map(String::as_str),
        }
    }
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        PrimitiveValue::Single(value.to_string())
    }
}

impl From<String> for PrimitiveValue {
    fn from(value: String) -> Self {
        PrimitiveValue::Single(value)
    }
}

impl From<Vec<String>> for PrimitiveValue {
    fn from(values: Vec<String>) -> Self {
        PrimitiveValue::Many(values)
    }
}

impl From<Vec<&str>> for PrimitiveValue {
    fn from(values: Vec<&str>) -> Self {
        PrimitiveValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// The in-memory value of a field.
///
/// # Identity
///
/// Dirty checks in the store use [`FieldValue::same_value`], which mirrors
/// `Object.is`: scalars compare by value, while `Object` and `Array`
/// compare by *reference identity*. Two arrays built separately with the
/// same elements are different values and will produce a commit. Clone an
/// existing value (which shares the `Arc`) to keep it identical.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Null,
    String(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Object(Arc<serde_json::Value>),
    Array(Arc<Vec<FieldValue>>),
}

impl FieldValue {
    /// Build an array value from any iterable of values.
    pub fn array<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        FieldValue::Array(Arc::new(values.into_iter().map(Into::into).collect()))
    }

    /// Build an object value from a JSON document.
    pub fn object(value: serde_json::Value) -> Self {
        FieldValue::Object(Arc::new(value))
    }

    /// `Object.is` equality; see the type-level docs.
    pub fn same_value(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Number(a), FieldValue::Number(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            (FieldValue::Date(a), FieldValue::Date(b)) => a == b,
            (FieldValue::Object(a), FieldValue::Object(b)) => Arc::ptr_eq(a, b),
            (FieldValue::Array(a), FieldValue::Array(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&serde_json::Value> {
        match self {
            FieldValue::Object(value) => Some(value),
            _ => None,
        }
    }
}

/// Structural equality, for assertions and value maps.
///
/// This is *not* the store's dirty check; see [`FieldValue::same_value`].
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b,
            (FieldValue::Object(a), FieldValue::Object(b)) => a == b,
            (FieldValue::Array(a), FieldValue::Array(b)) => a == b,
            _ => self.same_value(other),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::String(value) => write!(f, "{value}"),
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Boolean(value) => write!(f, "{value}"),
            FieldValue::Date(value) => write!(f, "{}", value.to_rfc3339()),
            FieldValue::Object(value) => write!(f, "{value}"),
            FieldValue::Array(values) => {
                let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// The closed set of field types; determines the built-in serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "object")]
    Object,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "number[]")]
    NumberArray,
    #[serde(rename = "boolean[]")]
    BooleanArray,
    #[serde(rename = "date[]")]
    DateArray,
    #[serde(rename = "object[]")]
    ObjectArray,
}

impl FieldType {
    /// The type tag as written in configuration.
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::StringArray => "string[]",
            FieldType::NumberArray => "number[]",
            FieldType::BooleanArray => "boolean[]",
            FieldType::DateArray => "date[]",
            FieldType::ObjectArray => "object[]",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            FieldType::StringArray
                | FieldType::NumberArray
                | FieldType::BooleanArray
                | FieldType::DateArray
                | FieldType::ObjectArray
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FieldType {
    type Err = StoreError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "string" => Ok(FieldType::String),
            "number" => Ok(FieldType::Number),
            "boolean" => Ok(FieldType::Boolean),
            "date" => Ok(FieldType::Date),
            "object" => Ok(FieldType::Object),
            "string[]" => Ok(FieldType::StringArray),
            "number[]" => Ok(FieldType::NumberArray),
            "boolean[]" => Ok(FieldType::BooleanArray),
            "date[]" => Ok(FieldType::DateArray),
            "object[]" => Ok(FieldType::ObjectArray),
            other => Err(StoreError::UnknownFieldType {
                tag: other.to_string(),
            }),
        }
    }
}
