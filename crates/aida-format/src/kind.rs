/// Category tag of a declared type.
///
/// The discriminant is the ASCII tag stored in the first word of a type
/// record, so blobs stay readable in a hex dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum TypeKind {
    Untyped = 0,
    Void = b'v' as u32,
    Bool = b'b' as u32,
    Int32 = b'i' as u32,
    Int64 = b'l' as u32,
    Float64 = b'd' as u32,
    String = b's' as u32,
    Enum = b'E' as u32,
    Sequence = b'Q' as u32,
    Record = b'R' as u32,
    Instance = b'C' as u32,
    Remote = b'r' as u32,
    TypeReference = b'T' as u32,
    Any = b'Y' as u32,
}

impl TypeKind {
    pub const ALL: [TypeKind; 14] = [
        TypeKind::Untyped,
        TypeKind::Void,
        TypeKind::Bool,
        TypeKind::Int32,
        TypeKind::Int64,
        TypeKind::Float64,
        TypeKind::String,
        TypeKind::Enum,
        TypeKind::Sequence,
        TypeKind::Record,
        TypeKind::Instance,
        TypeKind::Remote,
        TypeKind::TypeReference,
        TypeKind::Any,
    ];

    /// Decode a stored tag, `None` for unknown tags.
    pub fn from_tag(tag: u32) -> Option<TypeKind> {
        TypeKind::ALL.iter().copied().find(|kind| *kind as u32 == tag)
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Upper-case kind name, as used in diagnostics and pretty output.
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Untyped => "UNTYPED",
            TypeKind::Void => "VOID",
            TypeKind::Bool => "BOOL",
            TypeKind::Int32 => "INT32",
            TypeKind::Int64 => "INT64",
            TypeKind::Float64 => "FLOAT64",
            TypeKind::String => "STRING",
            TypeKind::Enum => "ENUM",
            TypeKind::Sequence => "SEQUENCE",
            TypeKind::Record => "RECORD",
            TypeKind::Instance => "INSTANCE",
            TypeKind::Remote => "REMOTE",
            TypeKind::TypeReference => "TYPE_REFERENCE",
            TypeKind::Any => "ANY",
        }
    }

    /// Kinds whose `custom` word points at an index list.
    pub fn has_list_body(self) -> bool {
        matches!(
            self,
            TypeKind::Enum | TypeKind::Sequence | TypeKind::Record | TypeKind::Instance
        )
    }
}

impl core::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
