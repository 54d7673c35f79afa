//! Blob writer.
//!
//! Type declarations are flattened into three tables (records, lists,
//! strings) with symbolic references, then laid out and patched with
//! absolute offsets in [`BlobWriter::finish`]. The output is deterministic:
//! records and lists appear in creation order and strings are interned in
//! first-use order.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::kind::TypeKind;
use crate::layout::{align4, HEADER_SIZE, MAGIC, SENTINEL_SIZE, TYPE_RECORD_SIZE};

/// Errors raised while writing a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The declared body does not fit the declared kind.
    BodyMismatch { name: String, kind: TypeKind },
    /// A sequence must declare exactly one element field.
    SequenceArity { name: String, count: usize },
    /// Interface prerequisites must be type references.
    BadPrerequisite { name: String },
    /// The blob would not be addressable with 32-bit offsets.
    TooLarge,
}

impl core::fmt::Display for FormatError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FormatError::BodyMismatch { name, kind } => {
                write!(f, "type '{}' has a body that does not match kind {}", name, kind)
            }
            FormatError::SequenceArity { name, count } => {
                write!(f, "sequence '{}' needs one element field, got {}", name, count)
            }
            FormatError::BadPrerequisite { name } => {
                write!(f, "prerequisite of '{}' is not a type reference", name)
            }
            FormatError::TooLarge => f.write_str("blob exceeds 32-bit offsets"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}

/// One enumerator of an enum declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueDecl {
    pub ident: String,
    pub value: i64,
    pub label: String,
    pub blurb: String,
}

impl EnumValueDecl {
    pub fn new(ident: impl Into<String>, value: i64) -> Self {
        Self {
            ident: ident.into(),
            value,
            label: String::new(),
            blurb: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_blurb(mut self, blurb: impl Into<String>) -> Self {
        self.blurb = blurb.into();
        self
    }
}

/// Kind-specific payload of a declaration; becomes the `custom` word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBody {
    None,
    Enum(Vec<EnumValueDecl>),
    /// Record fields, the single sequence element, or interface prerequisites.
    Fields(Vec<TypeDecl>),
    /// Target name of a type reference.
    Reference(String),
}

/// A type declaration as emitted by the offline generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    /// `key=value` strings.
    pub aux: Vec<String>,
    pub body: TypeBody,
}

impl TypeDecl {
    /// A declaration without body, for primitive kinds.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            aux: Vec::new(),
            body: TypeBody::None,
        }
    }

    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            body: TypeBody::Reference(target.into()),
            ..Self::new(name, TypeKind::TypeReference)
        }
    }

    pub fn record(name: impl Into<String>, fields: Vec<TypeDecl>) -> Self {
        Self {
            body: TypeBody::Fields(fields),
            ..Self::new(name, TypeKind::Record)
        }
    }

    pub fn sequence(name: impl Into<String>, element: TypeDecl) -> Self {
        Self {
            body: TypeBody::Fields(alloc::vec![element]),
            ..Self::new(name, TypeKind::Sequence)
        }
    }

    pub fn enumeration(name: impl Into<String>, values: Vec<EnumValueDecl>) -> Self {
        Self {
            body: TypeBody::Enum(values),
            ..Self::new(name, TypeKind::Enum)
        }
    }

    /// An interface; each prerequisite names a base interface.
    pub fn interface<S: Into<String>>(
        name: impl Into<String>,
        prerequisites: impl IntoIterator<Item = S>,
    ) -> Self {
        let prerequisites = prerequisites
            .into_iter()
            .map(|p| {
                let p = p.into();
                TypeDecl::reference(p.clone(), p)
            })
            .collect();
        Self {
            body: TypeBody::Fields(prerequisites),
            ..Self::new(name, TypeKind::Instance)
        }
    }

    /// Append one `key=value` aux string.
    pub fn with_aux(mut self, key: &str, value: &str) -> Self {
        let mut entry = String::with_capacity(key.len() + 1 + value.len());
        entry.push_str(key);
        entry.push('=');
        entry.push_str(value);
        self.aux.push(entry);
        self
    }

    fn check_body(&self) -> Result<(), FormatError> {
        let mismatch = || FormatError::BodyMismatch {
            name: self.name.clone(),
            kind: self.kind,
        };
        match (&self.body, self.kind) {
            (TypeBody::Enum(_), TypeKind::Enum) => Ok(()),
            (TypeBody::Reference(_), TypeKind::TypeReference) => Ok(()),
            (TypeBody::Fields(_), TypeKind::Record) => Ok(()),
            (TypeBody::Fields(fields), TypeKind::Sequence) => {
                if fields.len() == 1 {
                    Ok(())
                } else {
                    Err(FormatError::SequenceArity {
                        name: self.name.clone(),
                        count: fields.len(),
                    })
                }
            }
            (TypeBody::Fields(fields), TypeKind::Instance) => {
                if fields.iter().all(|f| f.kind == TypeKind::TypeReference) {
                    Ok(())
                } else {
                    Err(FormatError::BadPrerequisite {
                        name: self.name.clone(),
                    })
                }
            }
            (TypeBody::None, kind) if !kind.has_list_body() && kind != TypeKind::TypeReference => {
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Ref {
    Null,
    Type(usize),
    List(usize),
    Str(usize),
}

struct Record {
    kind: TypeKind,
    name: Ref,
    aux: Ref,
    custom: Ref,
}

/// Incremental blob builder.
#[derive(Default)]
pub struct BlobWriter {
    records: Vec<Record>,
    lists: Vec<Vec<Ref>>,
    strings: Vec<String>,
    interned: HashMap<String, usize>,
    top: Vec<Ref>,
}

impl BlobWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level type.
    pub fn add(&mut self, decl: &TypeDecl) -> Result<(), FormatError> {
        let index = self.add_type(decl)?;
        self.top.push(Ref::Type(index));
        Ok(())
    }

    fn intern(&mut self, s: &str) -> Ref {
        if let Some(&index) = self.interned.get(s) {
            return Ref::Str(index);
        }
        let index = self.strings.len();
        self.strings.push(s.to_string());
        self.interned.insert(s.to_string(), index);
        Ref::Str(index)
    }

    fn intern_optional(&mut self, s: &str) -> Ref {
        if s.is_empty() {
            Ref::Null
        } else {
            self.intern(s)
        }
    }

    fn add_list(&mut self, entries: Vec<Ref>) -> Ref {
        let index = self.lists.len();
        self.lists.push(entries);
        Ref::List(index)
    }

    fn add_type(&mut self, decl: &TypeDecl) -> Result<usize, FormatError> {
        decl.check_body()?;
        let index = self.records.len();
        self.records.push(Record {
            kind: decl.kind,
            name: Ref::Null,
            aux: Ref::Null,
            custom: Ref::Null,
        });

        let name = self.intern(&decl.name);
        let aux = if decl.aux.is_empty() {
            Ref::Null
        } else {
            let entries = decl.aux.iter().map(|a| self.intern(a)).collect();
            self.add_list(entries)
        };
        let custom = match &decl.body {
            TypeBody::None => Ref::Null,
            TypeBody::Reference(target) => self.intern(target),
            TypeBody::Fields(fields) => {
                let mut entries = Vec::with_capacity(fields.len());
                for field in fields {
                    entries.push(Ref::Type(self.add_type(field)?));
                }
                self.add_list(entries)
            }
            TypeBody::Enum(values) => {
                let mut entries = Vec::with_capacity(values.len());
                for value in values {
                    let ident = self.intern(&value.ident);
                    let number = self.intern(&value.value.to_string());
                    let label = self.intern_optional(&value.label);
                    let blurb = self.intern_optional(&value.blurb);
                    entries.push(self.add_list(alloc::vec![ident, number, label, blurb]));
                }
                self.add_list(entries)
            }
        };

        let record = &mut self.records[index];
        record.name = name;
        record.aux = aux;
        record.custom = custom;
        Ok(index)
    }

    /// Lay out all tables and produce the blob, sentinel included.
    pub fn finish(mut self) -> Result<Vec<u8>, FormatError> {
        let top = core::mem::take(&mut self.top);
        let top_list = self.add_list(top);

        let seg_types = HEADER_SIZE as u64;
        let seg_lists = seg_types + TYPE_RECORD_SIZE as u64 * self.records.len() as u64;

        let mut list_offsets = Vec::with_capacity(self.lists.len());
        let mut cursor = seg_lists;
        for list in &self.lists {
            list_offsets.push(cursor);
            cursor += 4 + 4 * list.len() as u64;
        }
        let seg_strings = cursor;

        let mut string_offsets = Vec::with_capacity(self.strings.len());
        for s in &self.strings {
            string_offsets.push(cursor);
            let len = u32::try_from(s.len()).map_err(|_| FormatError::TooLarge)?;
            cursor += 4 + align4(len) as u64;
        }
        let length = cursor;
        if length + SENTINEL_SIZE as u64 > u32::MAX as u64 {
            return Err(FormatError::TooLarge);
        }

        // Every offset below fits in u32 because `length` does.
        let resolve = |r: Ref| -> u32 {
            match r {
                Ref::Null => 0,
                Ref::Type(i) => (seg_types + TYPE_RECORD_SIZE as u64 * i as u64) as u32,
                Ref::List(i) => list_offsets[i] as u32,
                Ref::Str(i) => string_offsets[i] as u32,
            }
        };

        let mut out = Vec::with_capacity((length + SENTINEL_SIZE as u64) as usize);
        out.extend_from_slice(&MAGIC);
        for word in [
            length as u32,
            seg_types as u32,
            seg_lists as u32,
            seg_strings as u32,
            resolve(top_list),
            0,
        ] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for record in &self.records {
            for word in [
                record.kind.tag(),
                resolve(record.name),
                resolve(record.aux),
                resolve(record.custom),
            ] {
                out.extend_from_slice(&word.to_le_bytes());
            }
        }
        for list in &self.lists {
            out.extend_from_slice(&(list.len() as u32).to_le_bytes());
            for entry in list {
                out.extend_from_slice(&resolve(*entry).to_le_bytes());
            }
        }
        for s in &self.strings {
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
            let padded = align4(s.len() as u32) as usize;
            out.resize(out.len() + padded - s.len(), 0);
        }
        out.extend_from_slice(&[0u8; SENTINEL_SIZE as usize]);
        Ok(out)
    }
}

/// Encode a list of top-level declarations into a blob.
pub fn encode(decls: &[TypeDecl]) -> Result<Vec<u8>, FormatError> {
    let mut writer = BlobWriter::new();
    for decl in decls {
        writer.add(decl)?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{read_u32, OFFSET_LENGTH, OFFSET_SEG_LISTS, OFFSET_SEG_STRINGS, OFFSET_TYPES};

    #[test]
    fn empty_map_layout() {
        let blob = encode(&[]).unwrap();
        // header + one empty top-level list
        assert_eq!(blob.len(), 40 + 4 + 4);
        assert_eq!(&blob[..16], &MAGIC);
        assert_eq!(read_u32(&blob, OFFSET_LENGTH), Some(44));
        assert_eq!(read_u32(&blob, OFFSET_SEG_LISTS), Some(40));
        assert_eq!(read_u32(&blob, OFFSET_SEG_STRINGS), Some(44));
        assert_eq!(read_u32(&blob, OFFSET_TYPES), Some(40));
        assert_eq!(&blob[44..], &[0, 0, 0, 0]);
    }

    #[test]
    fn strings_are_interned_and_padded() {
        let decls = [
            TypeDecl::new("abc", TypeKind::Int32),
            TypeDecl::reference("alias", "abc"),
        ];
        let blob = encode(&decls).unwrap();
        let seg_strings = read_u32(&blob, OFFSET_SEG_STRINGS).unwrap() as usize;
        let length = read_u32(&blob, OFFSET_LENGTH).unwrap() as usize;
        // "abc" (4 + 4) and "alias" (4 + 8), "abc" reused by the reference
        assert_eq!(length - seg_strings, 8 + 12);
        assert_eq!(length % 4, 0);
    }

    #[test]
    fn sequence_needs_one_element() {
        let decl = TypeDecl {
            body: TypeBody::Fields(Vec::new()),
            ..TypeDecl::new("empty_seq", TypeKind::Sequence)
        };
        assert_eq!(
            encode(&[decl]),
            Err(FormatError::SequenceArity {
                name: "empty_seq".to_string(),
                count: 0
            })
        );
    }

    #[test]
    fn primitive_with_body_is_rejected() {
        let decl = TypeDecl {
            body: TypeBody::Reference("x".to_string()),
            ..TypeDecl::new("bad", TypeKind::Bool)
        };
        assert!(matches!(
            encode(&[decl]),
            Err(FormatError::BodyMismatch { .. })
        ));
    }

    #[test]
    fn reference_without_target_is_rejected() {
        let decl = TypeDecl::new("dangling", TypeKind::TypeReference);
        assert!(encode(&[decl]).is_err());
    }
}
