//! serde support for `AnyValue`.
//!
//! Values serialize to their natural data-model shape; enums with a known
//! identifier serialize as that identifier.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::{AnyValue, Payload};

impl Serialize for AnyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.payload {
            Payload::Untyped => serializer.serialize_unit(),
            Payload::Bool(v) => serializer.serialize_bool(*v),
            Payload::Int64(v) => serializer.serialize_i64(*v),
            Payload::Float64(v) => serializer.serialize_f64(*v),
            Payload::String(v) => serializer.serialize_str(v),
            Payload::Enum(v) => match self.enum_ident() {
                Some(ident) => serializer.serialize_str(&ident),
                None => serializer.serialize_i64(*v),
            },
            Payload::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Payload::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for field in fields {
                    map.serialize_entry(&field.name, &field.value)?;
                }
                map.end()
            }
            Payload::Any(inner) => inner.serialize(serializer),
        }
    }
}
