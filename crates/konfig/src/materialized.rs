//! Materialized values.
//!
//! Every operation invocation produces a [`Materialized`] value: a tagged
//! representation of what the coercion engine built from the configuration
//! node. Callers that know the declared shape go through the typed getters
//! on [`ConfigProxy`](crate::ConfigProxy); generic callers (tooling, tests)
//! can walk the tags directly.

use indexmap::IndexMap;

use crate::proxy::ConfigProxy;

/// A scalar produced by coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    I8(i8),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 32-bit floating point.
    F32(f32),
    /// 64-bit floating point.
    F64(f64),
    /// A single character.
    Char(char),
    /// A string.
    Str(String),
}

/// The result of one operation invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// The path had no value (undefined or null) and the shape tolerates
    /// absence.
    Absent,
    /// A coerced scalar.
    Scalar(Scalar),
    /// A list of materialized elements, order preserved.
    List(Vec<Materialized>),
    /// A string-keyed map of materialized entries, insertion order
    /// preserved.
    Map(IndexMap<String, Materialized>),
    /// A proxy over a nested contract.
    Contract(ConfigProxy),
}

impl Materialized {
    /// Whether this is the absent value.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The boolean payload, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(Scalar::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// The `i8` payload, if this is one.
    #[must_use]
    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Self::Scalar(Scalar::I8(v)) => Some(*v),
            _ => None,
        }
    }

    /// The `i16` payload, if this is one.
    #[must_use]
    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Self::Scalar(Scalar::I16(v)) => Some(*v),
            _ => None,
        }
    }

    /// The `i32` payload, if this is one.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Scalar(Scalar::I32(v)) => Some(*v),
            _ => None,
        }
    }

    /// The `i64` payload, if this is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Scalar(Scalar::I64(v)) => Some(*v),
            _ => None,
        }
    }

    /// The `f32` payload, if this is one.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Scalar(Scalar::F32(v)) => Some(*v),
            _ => None,
        }
    }

    /// The `f64` payload, if this is one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Scalar(Scalar::F64(v)) => Some(*v),
            _ => None,
        }
    }

    /// The character payload, if this is one.
    #[must_use]
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Scalar(Scalar::Char(v)) => Some(*v),
            _ => None,
        }
    }

    /// The string payload, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::Str(v)) => Some(v),
            _ => None,
        }
    }

    /// The list payload, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Materialized]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The map payload, if this is one.
    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, Materialized>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// The nested proxy, if this is one.
    #[must_use]
    pub fn as_contract(&self) -> Option<&ConfigProxy> {
        match self {
            Self::Contract(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Renders the value as JSON for diagnostics and tooling. Absence
    /// becomes `null`; nested proxies render as their display string.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Absent => serde_json::Value::Null,
            Self::Scalar(scalar) => match scalar {
                Scalar::Bool(v) => serde_json::Value::Bool(*v),
                Scalar::I8(v) => serde_json::Value::from(*v),
                Scalar::I16(v) => serde_json::Value::from(*v),
                Scalar::I32(v) => serde_json::Value::from(*v),
                Scalar::I64(v) => serde_json::Value::from(*v),
                Scalar::F32(v) => serde_json::Value::from(f64::from(*v)),
                Scalar::F64(v) => serde_json::Value::from(*v),
                Scalar::Char(v) => serde_json::Value::String(v.to_string()),
                Scalar::Str(v) => serde_json::Value::String(v.clone()),
            },
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Materialized::to_json).collect())
            }
            Self::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Contract(proxy) => serde_json::Value::String(proxy.to_string()),
        }
    }
}
