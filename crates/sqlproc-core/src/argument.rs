//! Procedure call arguments
//!
//! `CallArgument` is the closed set of values a stored procedure can be called
//! with. `RawArgument` is the loosely typed form used when arguments arrive from
//! a dynamic source (JSON payloads, scripting bridges) and may carry shapes that
//! have no SQL literal, such as objects or a missing value.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use std::fmt;

/// Wire text of the NULL marker.
///
/// Dynamic sources cannot distinguish an intentional SQL `NULL` from a
/// forgotten value, so they send this string instead. It is only recognized on
/// the [`RawArgument`] path; a typed [`CallArgument::String`] holding the same
/// text stays a string.
pub const NULL_MARKER_TEXT: &str = "______NULL______";

/// Explicit SQL `NULL` argument.
pub const NULL_MARKER: CallArgument = CallArgument::Null;

/// A numeric procedure argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    /// Kept at single precision so it prints the way it was written
    Float32(f32),
    Float(f64),
}

impl Number {
    /// NaN and infinities have no SQL literal.
    pub fn is_finite(&self) -> bool {
        match self {
            Number::Float32(v) => v.is_finite(),
            Number::Float(v) => v.is_finite(),
            _ => true,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{}", v),
            Number::UInt(v) => write!(f, "{}", v),
            Number::Float32(v) => write!(f, "{}", v),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A value that can be passed to a stored procedure
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgument {
    /// Text, sent as an escaped double-quoted literal
    String(String),
    /// Integer or floating point number, sent unquoted
    Number(Number),
    /// Sent as `1` or `0`
    Boolean(bool),
    /// Wall-clock date and time, sent as `"YYYY-MM-DD HH:MM:SS"`
    Timestamp(NaiveDateTime),
    /// Intentional SQL `NULL`
    Null,
}

impl CallArgument {
    /// Create a string argument
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Create a timestamp argument
    pub fn timestamp(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }

    /// Check if this is the NULL marker
    pub fn is_null(&self) -> bool {
        matches!(self, CallArgument::Null)
    }
}

impl fmt::Display for CallArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArgument::String(v) => write!(f, "{:?}", v),
            CallArgument::Number(v) => write!(f, "{}", v),
            CallArgument::Boolean(v) => write!(f, "{}", v),
            CallArgument::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            CallArgument::Null => write!(f, "NULL"),
        }
    }
}

impl From<&str> for CallArgument {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for CallArgument {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for CallArgument {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<bool> for CallArgument {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for CallArgument {
            fn from(value: $ty) -> Self {
                Self::Number(Number::Int(value as i64))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for CallArgument {
            fn from(value: $ty) -> Self {
                Self::Number(Number::UInt(value as u64))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<f32> for CallArgument {
    fn from(value: f32) -> Self {
        Self::Number(Number::Float32(value))
    }
}

impl From<f64> for CallArgument {
    fn from(value: f64) -> Self {
        Self::Number(Number::Float(value))
    }
}

impl From<Number> for CallArgument {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDateTime> for CallArgument {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

/// Zoned timestamps are sent in their own offset, the way they would print.
impl<Tz: TimeZone> From<DateTime<Tz>> for CallArgument {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Timestamp(value.naive_local())
    }
}

/// An argument as received from a dynamically typed source.
///
/// Only [`RawArgument::Value`] can be marshalled; every other variant is
/// rejected with a diagnostic naming its shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArgument {
    Value(CallArgument),
    /// The caller left the slot empty
    Undefined,
    /// A native null, which is not the same as the NULL marker
    Null,
    Object(serde_json::Map<String, serde_json::Value>),
    Array(Vec<serde_json::Value>),
    /// Functions, symbols and anything else that is not data
    Opaque(String),
}

impl fmt::Display for RawArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawArgument::Value(v) => write!(f, "{}", v),
            RawArgument::Undefined => write!(f, "undefined"),
            RawArgument::Null => write!(f, "null"),
            RawArgument::Object(map) => write!(f, "{}", serde_json::Value::Object(map.clone())),
            RawArgument::Array(items) => write!(f, "{}", serde_json::Value::Array(items.clone())),
            RawArgument::Opaque(description) => write!(f, "<{}>", description),
        }
    }
}

impl From<CallArgument> for RawArgument {
    fn from(value: CallArgument) -> Self {
        Self::Value(value)
    }
}

impl From<serde_json::Value> for RawArgument {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => RawArgument::Null,
            Json::Bool(v) => RawArgument::Value(CallArgument::Boolean(v)),
            Json::Number(n) => {
                let number = if let Some(v) = n.as_i64() {
                    Number::Int(v)
                } else if let Some(v) = n.as_u64() {
                    Number::UInt(v)
                } else {
                    match n.as_f64() {
                        Some(v) => Number::Float(v),
                        None => return RawArgument::Opaque(format!("number {}", n)),
                    }
                };
                RawArgument::Value(CallArgument::Number(number))
            }
            Json::String(s) if s == NULL_MARKER_TEXT => RawArgument::Value(CallArgument::Null),
            Json::String(s) => RawArgument::Value(CallArgument::String(s)),
            Json::Array(items) => RawArgument::Array(items),
            Json::Object(map) => RawArgument::Object(map),
        }
    }
}

impl From<Option<serde_json::Value>> for RawArgument {
    fn from(value: Option<serde_json::Value>) -> Self {
        match value {
            Some(v) => v.into(),
            None => RawArgument::Undefined,
        }
    }
}

#[cfg(test)]
mod tests;
