//! Extraction from `AnyValue`.
//!
//! Conversions are best effort: numbers convert between each other with
//! `as` semantics (narrowing truncates, unsigned values round-trip through
//! their two's complement storage), strings parse into numbers and numbers
//! format into strings, and a string is `true` when non-empty.

use thiserror::Error;

use super::{AnyValue, AnyVector, FieldVector, Payload};
use crate::typemap::TypeKind;

/// Failed typed extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {from} value to {to}")]
pub struct ConversionError {
    pub from: TypeKind,
    pub to: &'static str,
}

/// Types that can be extracted from an [`AnyValue`].
pub trait FromAny: Sized {
    fn from_any(value: &AnyValue) -> Option<Self>;
}

impl AnyValue {
    fn as_i64(&self) -> Option<i64> {
        match &self.payload {
            Payload::Bool(v) => Some(*v as i64),
            Payload::Int64(v) | Payload::Enum(v) => Some(*v),
            Payload::Float64(v) => Some(*v as i64),
            Payload::String(s) => parse_i64(s),
            Payload::Any(inner) => inner.as_i64(),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match &self.payload {
            Payload::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Payload::Int64(v) | Payload::Enum(v) => Some(*v as f64),
            Payload::Float64(v) => Some(*v),
            Payload::String(s) => s.trim().parse::<f64>().ok(),
            Payload::Any(inner) => inner.as_f64(),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match &self.payload {
            Payload::Bool(v) => Some(*v),
            Payload::Int64(v) | Payload::Enum(v) => Some(*v != 0),
            Payload::Float64(v) => Some(*v != 0.0),
            Payload::String(s) => Some(!s.is_empty()),
            Payload::Any(inner) => inner.as_bool(),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<String> {
        match &self.payload {
            Payload::String(s) => Some(s.clone()),
            Payload::Bool(v) => Some(v.to_string()),
            Payload::Int64(v) => Some(v.to_string()),
            Payload::Float64(v) => Some(v.to_string()),
            Payload::Enum(v) => Some(self.enum_ident().unwrap_or_else(|| v.to_string())),
            Payload::Any(inner) => inner.as_text(),
            _ => None,
        }
    }
}

/// Integers parse directly; anything else that parses as a float truncates.
fn parse_i64(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
}

macro_rules! from_any_int {
    ($($t:ty),*) => {$(
        impl FromAny for $t {
            fn from_any(value: &AnyValue) -> Option<Self> {
                value.as_i64().map(|v| v as $t)
            }
        }
    )*};
}

from_any_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromAny for f64 {
    fn from_any(value: &AnyValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromAny for f32 {
    fn from_any(value: &AnyValue) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl FromAny for bool {
    fn from_any(value: &AnyValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromAny for String {
    fn from_any(value: &AnyValue) -> Option<Self> {
        value.as_text()
    }
}

/// Only a value that holds a nested value yields one.
impl FromAny for AnyValue {
    fn from_any(value: &AnyValue) -> Option<Self> {
        match &value.payload {
            Payload::Any(inner) => Some((**inner).clone()),
            _ => None,
        }
    }
}

impl FromAny for AnyVector {
    fn from_any(value: &AnyValue) -> Option<Self> {
        value.as_sequence().cloned()
    }
}

impl FromAny for FieldVector {
    fn from_any(value: &AnyValue) -> Option<Self> {
        value.as_record().cloned()
    }
}
