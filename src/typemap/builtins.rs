//! The compiled-in builtin types.
//!
//! `builtins.aidatypes` is generated from [`builtin_declarations`] with
//! `aida builtins --emit <file>`; a unit test keeps the two in sync.

use std::sync::OnceLock;

use aida_format::{TypeDecl, TypeKind};

use super::{TypeCode, TypeMap};

static BUILTINS_BLOB: &[u8] = include_bytes!("builtins.aidatypes");

static BUILTINS: OnceLock<TypeMap> = OnceLock::new();

/// Declarations of every builtin type, in blob order.
pub fn builtin_declarations() -> Vec<TypeDecl> {
    vec![
        TypeDecl::new("void", TypeKind::Void),
        TypeDecl::new("bool", TypeKind::Bool),
        TypeDecl::new("int32", TypeKind::Int32),
        TypeDecl::new("int64", TypeKind::Int64),
        TypeDecl::new("float64", TypeKind::Float64),
        TypeDecl::new("string", TypeKind::String),
        TypeDecl::new("any", TypeKind::Any),
        TypeDecl::sequence("any_seq", TypeDecl::new("", TypeKind::Any)),
        TypeDecl::record("any_rec", Vec::new()),
    ]
}

impl TypeMap {
    /// The builtin type map, validated once per process.
    ///
    /// Every other map is defined relative to these types, so a damaged
    /// builtin blob aborts the process.
    pub fn builtins() -> TypeMap {
        BUILTINS
            .get_or_init(|| match TypeMap::from_static(BUILTINS_BLOB) {
                Ok(map) => map,
                Err(err) => {
                    log::error!("builtin type map is corrupt: {}", err);
                    std::process::abort();
                }
            })
            .clone()
    }
}

/// Builtin type used to describe values stored with `kind`.
pub(crate) fn builtin_for(kind: TypeKind) -> TypeCode {
    let name = match kind {
        TypeKind::Void => "void",
        TypeKind::Bool => "bool",
        TypeKind::Int32 => "int32",
        TypeKind::Int64 => "int64",
        TypeKind::Float64 => "float64",
        TypeKind::String => "string",
        TypeKind::Any => "any",
        TypeKind::Sequence => "any_seq",
        TypeKind::Record => "any_rec",
        _ => return TypeCode::untyped(),
    };
    TypeMap::builtins()
        .lookup_local(name)
        .unwrap_or_else(TypeCode::untyped)
}
