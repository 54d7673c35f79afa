//! Dynamically typed values
//!
//! `AnyValue` carries any primitive, string, enum, nested value or
//! collection across a binding boundary. Scalars are stored canonically:
//! every integer as `i64`, every float as `f64`. A value may additionally be
//! tagged with the declared [`TypeCode`] it was produced for.

mod convert;
mod ser;

pub use convert::{ConversionError, FromAny};

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::typemap::{builtin_for, TypeCode, TypeKind};

/// Storage of an [`AnyValue`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Untyped,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Enum(i64),
    Sequence(AnyVector),
    Record(FieldVector),
    Any(Box<AnyValue>),
}

impl Payload {
    pub fn kind(&self) -> TypeKind {
        match self {
            Payload::Untyped => TypeKind::Untyped,
            Payload::Bool(_) => TypeKind::Bool,
            Payload::Int64(_) => TypeKind::Int64,
            Payload::Float64(_) => TypeKind::Float64,
            Payload::String(_) => TypeKind::String,
            Payload::Enum(_) => TypeKind::Enum,
            Payload::Sequence(_) => TypeKind::Sequence,
            Payload::Record(_) => TypeKind::Record,
            Payload::Any(_) => TypeKind::Any,
        }
    }

    /// Fresh payload for a storage kind.
    fn empty(kind: TypeKind) -> Payload {
        match kind {
            TypeKind::Bool => Payload::Bool(false),
            TypeKind::Int64 => Payload::Int64(0),
            TypeKind::Float64 => Payload::Float64(0.0),
            TypeKind::String => Payload::String(String::new()),
            TypeKind::Enum => Payload::Enum(0),
            TypeKind::Sequence => Payload::Sequence(AnyVector::new()),
            TypeKind::Record => Payload::Record(FieldVector::new()),
            TypeKind::Any => Payload::Any(Box::default()),
            _ => Payload::Untyped,
        }
    }
}

/// Storage kind used for values of a declared kind.
fn storage_kind(declared: TypeKind) -> TypeKind {
    match declared {
        TypeKind::Bool => TypeKind::Bool,
        TypeKind::Int32 | TypeKind::Int64 => TypeKind::Int64,
        TypeKind::Float64 => TypeKind::Float64,
        TypeKind::String => TypeKind::String,
        TypeKind::Enum => TypeKind::Enum,
        TypeKind::Sequence => TypeKind::Sequence,
        TypeKind::Record => TypeKind::Record,
        TypeKind::Any => TypeKind::Any,
        _ => TypeKind::Untyped,
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub struct AnyValue {
    payload: Payload,
    tag: Option<TypeCode>,
}

impl AnyValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A value holding another value.
    pub fn wrap(inner: AnyValue) -> Self {
        Payload::Any(Box::new(inner)).into()
    }

    /// An enum value; untagged `Int64` when `enum_type` is not an enum.
    pub fn from_enum(enum_type: &TypeCode, value: i64) -> Self {
        let mut any = AnyValue::new();
        any.set_enum(enum_type, value);
        any
    }

    pub fn kind(&self) -> TypeKind {
        self.payload.kind()
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self.payload, Payload::Untyped)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The declared type, or the builtin type of the storage kind.
    pub fn type_code(&self) -> TypeCode {
        if let Some(tag) = &self.tag {
            return tag.clone();
        }
        match self.kind() {
            TypeKind::Enum => builtin_for(TypeKind::Int64),
            kind => builtin_for(kind),
        }
    }

    /// Replace the whole value, dropping any type tag.
    pub fn set<T: Into<AnyValue>>(&mut self, value: T) {
        *self = value.into();
    }

    pub fn set_any(&mut self, inner: AnyValue) {
        *self = AnyValue::wrap(inner);
    }

    pub fn set_enum(&mut self, enum_type: &TypeCode, value: i64) {
        let resolved = enum_type.resolve_local();
        if resolved.kind() == TypeKind::Enum {
            self.payload = Payload::Enum(value);
            self.tag = Some(resolved);
        } else {
            log::debug!("'{}' is not an enum type, storing plain integer", enum_type);
            self.payload = Payload::Int64(value);
            self.tag = None;
        }
    }

    /// Switch the payload variant; the previous payload is dropped.
    fn rekind(&mut self, kind: TypeKind) {
        self.payload = Payload::empty(kind);
        self.tag = None;
    }

    /// Force a declared type. The payload is reset when the storage kind
    /// changes and kept otherwise.
    pub fn retype(&mut self, type_code: &TypeCode) {
        let resolved = type_code.resolve_local();
        let kind = storage_kind(resolved.kind());
        if kind != self.kind() {
            self.rekind(kind);
        }
        self.tag = if resolved.is_untyped() {
            None
        } else {
            Some(resolved)
        };
    }

    /// Make this a sequence of `len` elements, keeping existing elements.
    pub fn resize(&mut self, len: usize) {
        if self.kind() != TypeKind::Sequence {
            self.rekind(TypeKind::Sequence);
        }
        if let Payload::Sequence(items) = &mut self.payload {
            items.resize_with(len, AnyValue::new);
        }
    }

    /// Best-effort conversion, `None` when the stored kind does not fit.
    pub fn get<T: FromAny>(&self) -> Option<T> {
        T::from_any(self)
    }

    /// Convert into `target`; on failure `target` is left untouched.
    pub fn extract<T: FromAny>(&self, target: &mut T) -> bool {
        match T::from_any(self) {
            Some(value) => {
                *target = value;
                true
            }
            None => false,
        }
    }

    pub fn try_get<T: FromAny>(&self) -> Result<T, ConversionError> {
        T::from_any(self).ok_or_else(|| ConversionError {
            from: self.kind(),
            to: std::any::type_name::<T>(),
        })
    }

    pub fn as_sequence(&self) -> Option<&AnyVector> {
        match &self.payload {
            Payload::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut AnyVector> {
        match &mut self.payload {
            Payload::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&FieldVector> {
        match &self.payload {
            Payload::Record(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut FieldVector> {
        match &mut self.payload {
            Payload::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Field of a record value.
    pub fn field(&self, name: &str) -> Option<&AnyValue> {
        self.as_record()?.get(name)
    }

    /// Identifier of an enum value, when its type declares one.
    pub fn enum_ident(&self) -> Option<String> {
        match (&self.payload, &self.tag) {
            (Payload::Enum(value), Some(tag)) => tag.enum_find_value(*value).map(|v| v.ident),
            _ => None,
        }
    }
}

impl PartialEq for AnyValue {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl From<Payload> for AnyValue {
    fn from(payload: Payload) -> Self {
        Self { payload, tag: None }
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for AnyValue {
            fn from(v: $t) -> Self {
                Payload::Int64(v as i64).into()
            }
        }
    )*};
}

from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<bool> for AnyValue {
    fn from(v: bool) -> Self {
        Payload::Bool(v).into()
    }
}

impl From<f32> for AnyValue {
    fn from(v: f32) -> Self {
        Payload::Float64(v as f64).into()
    }
}

impl From<f64> for AnyValue {
    fn from(v: f64) -> Self {
        Payload::Float64(v).into()
    }
}

impl From<&str> for AnyValue {
    fn from(v: &str) -> Self {
        Payload::String(v.to_string()).into()
    }
}

impl From<String> for AnyValue {
    fn from(v: String) -> Self {
        Payload::String(v).into()
    }
}

impl From<AnyVector> for AnyValue {
    fn from(v: AnyVector) -> Self {
        Payload::Sequence(v).into()
    }
}

impl From<FieldVector> for AnyValue {
    fn from(v: FieldVector) -> Self {
        Payload::Record(v).into()
    }
}

impl fmt::Display for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Untyped => f.write_str("<untyped>"),
            Payload::Bool(v) => write!(f, "{}", v),
            Payload::Int64(v) => write!(f, "{}", v),
            Payload::Float64(v) => write!(f, "{}", v),
            Payload::String(v) => write!(f, "{:?}", v),
            Payload::Enum(v) => match self.enum_ident() {
                Some(ident) => f.write_str(&ident),
                None => write!(f, "{}", v),
            },
            Payload::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Payload::Record(fields) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {} = {}", field.name, field.value)?;
                }
                if !fields.is_empty() {
                    f.write_str(" ")?;
                }
                f.write_str("}")
            }
            Payload::Any(inner) => write!(f, "any({})", inner),
        }
    }
}

/// A sequence payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnyVector(Vec<AnyValue>);

impl AnyVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<AnyValue> {
        self.0
    }
}

impl Deref for AnyVector {
    type Target = Vec<AnyValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for AnyVector {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<AnyValue>> for AnyVector {
    fn from(items: Vec<AnyValue>) -> Self {
        Self(items)
    }
}

impl<T: Into<AnyValue>> FromIterator<T> for AnyVector {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for AnyVector {
    type Item = AnyValue;
    type IntoIter = std::vec::IntoIter<AnyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// One named member of a record payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: AnyValue,
}

/// A record payload: named values in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldVector(Vec<Field>);

impl FieldVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<AnyValue>) {
        self.0.push(Field {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Builder form of [`FieldVector::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AnyValue> {
        self.0.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AnyValue> {
        self.0.iter_mut().find(|f| f.name == name).map(|f| &mut f.value)
    }

    /// Replace the first field called `name`, or append a new one.
    pub fn set(&mut self, name: &str, value: impl Into<AnyValue>) {
        match self.get_mut(name) {
            Some(slot) => *slot = value.into(),
            None => self.push(name, value),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AnyValue> {
        let index = self.0.iter().position(|f| f.name == name)?;
        Some(self.0.remove(index).value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|f| f.name.as_str())
    }
}

impl<S: Into<String>, V: Into<AnyValue>> FromIterator<(S, V)> for FieldVector {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| Field {
                    name: name.into(),
                    value: value.into(),
                })
                .collect(),
        )
    }
}

impl IntoIterator for FieldVector {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldVector {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typemap::TypeMap;
    use aida_format::{encode, EnumValueDecl, TypeDecl};

    fn test_map() -> TypeMap {
        let bytes = encode(&[
            TypeDecl::enumeration(
                "Mode",
                vec![EnumValueDecl::new("MODE_OFF", 0), EnumValueDecl::new("MODE_ON", 1)],
            ),
            TypeDecl::record("Size", vec![TypeDecl::new("w", TypeKind::Int32)]),
            TypeDecl::reference("SizeAlias", "Size"),
        ])
        .unwrap();
        TypeMap::from_bytes(bytes).unwrap()
    }

    #[test]
    fn narrow_scalars_widen() {
        assert_eq!(AnyValue::from(7u8).kind(), TypeKind::Int64);
        assert_eq!(AnyValue::from(-7i16).payload(), &Payload::Int64(-7));
        assert_eq!(AnyValue::from(1.5f32).payload(), &Payload::Float64(1.5));
    }

    #[test]
    fn untagged_values_report_builtin_types() {
        assert_eq!(AnyValue::from(1i32).type_code().name(), "int64");
        assert_eq!(AnyValue::from("s").type_code().name(), "string");
        assert_eq!(AnyValue::from(AnyVector::new()).type_code().name(), "any_seq");
        assert!(AnyValue::new().type_code().is_untyped());
    }

    #[test]
    fn retype_resets_on_kind_change_only() {
        let map = test_map();
        let size = map.lookup_local("SizeAlias").unwrap();

        let mut v = AnyValue::from(5i64);
        v.retype(&size);
        assert_eq!(v.kind(), TypeKind::Record);
        assert!(v.as_record().unwrap().is_empty());
        assert_eq!(v.type_code().name(), "Size");

        v.as_record_mut().unwrap().push("w", 3i32);
        v.retype(&map.lookup_local("Size").unwrap());
        assert_eq!(v.field("w"), Some(&AnyValue::from(3i64)));
    }

    #[test]
    fn enum_values_are_tagged() {
        let map = test_map();
        let mode = map.lookup_local("Mode").unwrap();
        let on = AnyValue::from_enum(&mode, 1);
        assert_eq!(on.kind(), TypeKind::Enum);
        assert_eq!(on.type_code(), mode);
        assert_eq!(on.enum_ident().as_deref(), Some("MODE_ON"));
        assert_eq!(on.to_string(), "MODE_ON");
        assert_ne!(on, AnyValue::from(1i64));

        let plain = AnyValue::from_enum(&map.lookup_local("Size").unwrap(), 4);
        assert_eq!(plain.payload(), &Payload::Int64(4));
    }

    #[test]
    fn resize_keeps_existing_elements() {
        let mut v = AnyValue::from(vec![AnyValue::from(1i32)].into_iter().collect::<AnyVector>());
        v.resize(3);
        let items = v.as_sequence().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], AnyValue::from(1i64));
        assert!(items[2].is_untyped());

        let mut s = AnyValue::from("text");
        s.resize(2);
        assert_eq!(s.kind(), TypeKind::Sequence);
        assert_eq!(s.as_sequence().unwrap().len(), 2);
        s.resize(0);
        assert!(s.as_sequence().unwrap().is_empty());
    }

    #[test]
    fn field_vector_set_replaces() {
        let mut fields = FieldVector::new().with("a", 1i32).with("b", "x");
        fields.set("a", 2i32);
        fields.set("c", true);
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(fields.get("a"), Some(&AnyValue::from(2i64)));
        assert_eq!(fields.remove("b"), Some(AnyValue::from("x")));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn display_renders_nested_values() {
        let record = FieldVector::new()
            .with("n", 1i32)
            .with("s", "hi")
            .with("l", [1i32, 2].into_iter().collect::<AnyVector>());
        let v = AnyValue::wrap(AnyValue::from(record));
        assert_eq!(v.to_string(), "any({ n = 1, s = \"hi\", l = [1, 2] })");
        assert_eq!(AnyValue::from(FieldVector::new()).to_string(), "{}");
    }
}
