//! Views of single type records.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use aida_format::layout::ENUM_ENTRY_WORDS;
use aida_format::TypeKind;
use serde::Serialize;

use super::blob::{BlobError, IndexList, TypeRecord};
use super::{MapHandle, TypeMap, TypeRegistry};

/// One enumerator of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    pub value: i64,
    pub ident: String,
    pub label: String,
    pub blurb: String,
}

/// A view of one type record.
///
/// Holding a `TypeCode` keeps its blob alive. Accessors that only make sense
/// for some kinds (fields, enum values, prerequisites) return empty results
/// for every other kind.
#[derive(Clone, Default)]
pub struct TypeCode {
    handle: Option<Arc<MapHandle>>,
    offset: u32,
}

impl TypeCode {
    /// The type code of nothing.
    pub fn untyped() -> Self {
        Self::default()
    }

    pub(crate) fn new(handle: Arc<MapHandle>, offset: u32) -> Self {
        Self {
            handle: Some(handle),
            offset,
        }
    }

    fn record(&self) -> Option<(&MapHandle, TypeRecord)> {
        let handle = self.handle.as_deref()?;
        let record = handle.checked(handle.blob().record(self.offset))?;
        Some((handle, record))
    }

    /// The list body of this record, only when it has `kind`.
    fn body(&self, kind: TypeKind) -> Option<(&MapHandle, IndexList<'_>)> {
        let (handle, record) = self.record()?;
        if record.kind != kind.tag() {
            return None;
        }
        let list = handle.checked(handle.blob().list(record.custom))?;
        Some((handle, list))
    }

    pub fn kind(&self) -> TypeKind {
        self.record()
            .and_then(|(_, record)| TypeKind::from_tag(record.kind))
            .unwrap_or(TypeKind::Untyped)
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_untyped(&self) -> bool {
        self.kind() == TypeKind::Untyped
    }

    /// Declared name; field records carry the field name. Empty when untyped.
    pub fn name(&self) -> &str {
        self.record()
            .and_then(|(handle, record)| handle.checked(handle.blob().string(record.name)))
            .unwrap_or("")
    }

    /// All `key=value` aux strings.
    pub fn aux_data(&self) -> Vec<&str> {
        let Some((handle, record)) = self.record() else {
            return Vec::new();
        };
        if record.aux == 0 {
            return Vec::new();
        }
        let Some(list) = handle.checked(handle.blob().list(record.aux)) else {
            return Vec::new();
        };
        list.iter()
            .filter_map(|offset| handle.checked(handle.blob().string(offset)))
            .collect()
    }

    /// Value of the first aux entry `key=...`.
    pub fn aux_value(&self, key: &str) -> Option<&str> {
        self.aux_data().into_iter().find_map(|entry| {
            entry
                .strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
        })
    }

    /// The `hints` aux value wrapped in colons, so `":r:"` style searches
    /// work on the first and last hint too.
    pub fn hints(&self) -> String {
        format!(":{}:", self.aux_value("hints").unwrap_or(""))
    }

    pub fn enum_count(&self) -> usize {
        self.body(TypeKind::Enum).map_or(0, |(_, list)| list.len())
    }

    pub fn enum_value(&self, index: usize) -> Option<EnumValue> {
        let (handle, list) = self.body(TypeKind::Enum)?;
        let entry = list.get(index)?;
        read_enum_entry(handle, entry)
    }

    pub fn enum_values(&self) -> Vec<EnumValue> {
        let Some((handle, list)) = self.body(TypeKind::Enum) else {
            return Vec::new();
        };
        list.iter()
            .filter_map(|entry| read_enum_entry(handle, entry))
            .collect()
    }

    /// Find an enumerator by name.
    ///
    /// Matching order: exact identifier, then case-insensitive identifier
    /// with `-` read as `_`, then the first identifier whose `_`-separated
    /// tail equals the query case-insensitively (`RED` finds `COLOR_RED`).
    pub fn enum_find(&self, name: &str) -> Option<EnumValue> {
        if name.is_empty() {
            return None;
        }
        let values = self.enum_values();
        if let Some(v) = values.iter().find(|v| v.ident == name) {
            return Some(v.clone());
        }
        let query = name.replace('-', "_");
        if let Some(v) = values.iter().find(|v| v.ident.eq_ignore_ascii_case(&query)) {
            return Some(v.clone());
        }
        values
            .into_iter()
            .find(|v| ident_tail_matches(&v.ident, &query))
    }

    /// First enumerator carrying `value`.
    pub fn enum_find_value(&self, value: i64) -> Option<EnumValue> {
        self.enum_values().into_iter().find(|v| v.value == value)
    }

    /// Record fields, or the single element of a sequence.
    pub fn field_count(&self) -> usize {
        match self.kind() {
            TypeKind::Record => self.body(TypeKind::Record).map_or(0, |(_, l)| l.len()),
            TypeKind::Sequence => self.body(TypeKind::Sequence).map_or(0, |(_, l)| l.len()),
            _ => 0,
        }
    }

    pub fn field(&self, index: usize) -> TypeCode {
        let body = match self.kind() {
            TypeKind::Record => self.body(TypeKind::Record),
            TypeKind::Sequence => self.body(TypeKind::Sequence),
            _ => None,
        };
        self.member(body, index)
    }

    /// Record field by name.
    pub fn field_find(&self, name: &str) -> Option<TypeCode> {
        (0..self.field_count())
            .map(|i| self.field(i))
            .find(|f| f.name() == name)
    }

    /// Base interfaces of an instance type.
    pub fn prerequisite_count(&self) -> usize {
        self.body(TypeKind::Instance).map_or(0, |(_, l)| l.len())
    }

    pub fn prerequisite(&self, index: usize) -> TypeCode {
        let body = self.body(TypeKind::Instance);
        self.member(body, index)
    }

    fn member(&self, body: Option<(&MapHandle, IndexList<'_>)>, index: usize) -> TypeCode {
        let (Some(handle), Some((_, list))) = (&self.handle, body) else {
            return TypeCode::untyped();
        };
        match list.get(index) {
            Some(offset) => {
                // validate eagerly so a bad member is flagged once here
                match handle.checked(handle.blob().record(offset)) {
                    Some(_) => TypeCode::new(Arc::clone(handle), offset),
                    None => TypeCode::untyped(),
                }
            }
            None => TypeCode::untyped(),
        }
    }

    /// Target name of a type reference, empty for other kinds.
    pub fn origin(&self) -> &str {
        let Some((handle, record)) = self.record() else {
            return "";
        };
        if record.kind != TypeKind::TypeReference.tag() {
            return "";
        }
        handle
            .checked(handle.blob().string(record.custom))
            .unwrap_or("")
    }

    /// Follow type references through this map, then `registry`.
    pub fn resolve(&self, registry: &TypeRegistry) -> TypeCode {
        self.resolve_with(|name| registry.lookup(name))
    }

    /// Follow type references through this map and the builtins only.
    pub fn resolve_local(&self) -> TypeCode {
        self.resolve_with(|name| TypeMap::builtins().lookup_local(name))
    }

    fn resolve_with(&self, fallback: impl Fn(&str) -> Option<TypeCode>) -> TypeCode {
        let Some(handle) = &self.handle else {
            return TypeCode::untyped();
        };
        let max_depth = handle.limits().max_reference_depth;
        let mut current = self.clone();
        for _ in 0..=max_depth {
            if current.kind() != TypeKind::TypeReference {
                return current;
            }
            let target = current.origin();
            if target.is_empty() {
                return TypeCode::untyped();
            }
            let next = current
                .handle
                .as_ref()
                .and_then(|h| h.lookup(target))
                .or_else(|| fallback(target));
            match next {
                Some(next) => current = next,
                None => {
                    log::debug!("unresolved type reference '{}'", target);
                    return TypeCode::untyped();
                }
            }
        }
        log::warn!(
            "type reference chain from '{}' exceeds {} steps",
            self.name(),
            max_depth
        );
        handle.flag_error();
        TypeCode::untyped()
    }

    /// Multi-line description of this type and its members.
    pub fn pretty(&self, indent: &str) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, indent, &mut FieldWalk::new(), 0);
        out
    }

    fn pretty_into(&self, out: &mut String, indent: &str, walk: &mut FieldWalk, depth: usize) {
        use std::fmt::Write;

        let kind = self.kind();
        let _ = writeln!(out, "{}{} {}", indent, kind, self.name());
        for aux in self.aux_data() {
            let _ = writeln!(out, "{}  @{}", indent, aux);
        }
        let nested = format!("{}  ", indent);
        match kind {
            TypeKind::TypeReference => {
                let _ = writeln!(out, "{}-> {}", nested, self.origin());
            }
            TypeKind::Enum => {
                for v in self.enum_values() {
                    let _ = write!(out, "{}{} = {}", nested, v.ident, v.value);
                    if !v.label.is_empty() {
                        let _ = write!(out, " \"{}\"", v.label);
                    }
                    out.push('\n');
                }
            }
            TypeKind::Record | TypeKind::Sequence => {
                for field in walk.fields(self, depth) {
                    field.pretty_into(out, &nested, walk, depth + 1);
                }
            }
            TypeKind::Instance => {
                for i in 0..self.prerequisite_count() {
                    let _ = writeln!(out, "{}: {}", nested, self.prerequisite(i).origin());
                }
            }
            _ => {}
        }
    }
}

/// Guard for a recursive descent through nested fields.
///
/// Blobs from the generator never share a composite record between two
/// parents, so a record reached twice in one walk is a cycle. Nesting is
/// also capped at [`Limits::max_reference_depth`](super::Limits). Both
/// conditions flag the map and end the descent at that record.
#[derive(Debug, Default)]
pub struct FieldWalk {
    seen: HashSet<u32>,
}

impl FieldWalk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members of `ty` to descend into from nesting level `depth`.
    pub fn fields(&mut self, ty: &TypeCode, depth: usize) -> Vec<TypeCode> {
        let Some(handle) = ty.handle.as_deref() else {
            return Vec::new();
        };
        let count = ty.field_count();
        if count == 0 {
            return Vec::new();
        }
        if !self.seen.insert(ty.offset) {
            log::warn!("type '{}' contains itself", ty.name());
            handle.flag_error();
            return Vec::new();
        }
        let limit = handle.limits().max_reference_depth;
        if depth >= limit {
            log::warn!("type '{}' nests deeper than {} levels", ty.name(), limit);
            handle.flag_error();
            return Vec::new();
        }
        (0..count).map(|i| ty.field(i)).collect()
    }
}

fn read_enum_entry(handle: &MapHandle, entry: u32) -> Option<EnumValue> {
    let blob = handle.blob();
    let words = handle.checked(blob.list(entry))?;
    if words.len() != ENUM_ENTRY_WORDS as usize {
        return handle.checked(Err(BlobError::BadEnumEntry { offset: entry }));
    }
    let string_at = |index: usize| -> Option<String> {
        match words.get(index)? {
            0 => Some(String::new()),
            offset => handle.checked(blob.string(offset)).map(str::to_string),
        }
    };
    let ident = string_at(0)?;
    let value = match string_at(1)?.parse::<i64>() {
        Ok(value) => value,
        Err(_) => return handle.checked(Err(BlobError::BadEnumEntry { offset: entry })),
    };
    Some(EnumValue {
        value,
        ident,
        label: string_at(2)?,
        blurb: string_at(3)?,
    })
}

/// `COLOR_RED` matches `red` and `color_red`, but not `OR_RED` split mid-word.
fn ident_tail_matches(ident: &str, query: &str) -> bool {
    if query.len() >= ident.len() {
        return false;
    }
    let split = ident.len() - query.len();
    ident.as_bytes()[split - 1] == b'_'
        && ident.is_char_boundary(split)
        && ident[split..].eq_ignore_ascii_case(query)
}

impl PartialEq for TypeCode {
    fn eq(&self, other: &Self) -> bool {
        match (&self.handle, &other.handle) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) && self.offset == other.offset,
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for TypeCode {}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeCode({}: {})", self.name(), self.kind())
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_untyped() {
            f.write_str("<untyped>")
        } else {
            f.write_str(self.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aida_format::{encode, EnumValueDecl, TypeDecl};

    fn color_map() -> TypeMap {
        let bytes = encode(&[
            TypeDecl::enumeration(
                "Color",
                vec![
                    EnumValueDecl::new("COLOR_RED", 1).with_label("Red"),
                    EnumValueDecl::new("COLOR_DARK_RED", 2),
                    EnumValueDecl::new("COLOR_BLUE", -3).with_blurb("cold"),
                ],
            )
            .with_aux("hints", "rw"),
            TypeDecl::record(
                "Point",
                vec![
                    TypeDecl::new("x", TypeKind::Float64),
                    TypeDecl::new("y", TypeKind::Float64),
                    TypeDecl::reference("color", "Color"),
                ],
            ),
        ])
        .unwrap();
        TypeMap::from_bytes(bytes).unwrap()
    }

    #[test]
    fn enum_values_decode() {
        let color = color_map().lookup_local("Color").unwrap();
        assert_eq!(color.enum_count(), 3);
        let blue = color.enum_value(2).unwrap();
        assert_eq!(blue.ident, "COLOR_BLUE");
        assert_eq!(blue.value, -3);
        assert_eq!(blue.blurb, "cold");
        assert_eq!(color.enum_value(0).unwrap().label, "Red");
        assert!(color.enum_value(3).is_none());
    }

    #[test]
    fn enum_find_order() {
        let color = color_map().lookup_local("Color").unwrap();
        assert_eq!(color.enum_find("COLOR_RED").unwrap().value, 1);
        assert_eq!(color.enum_find("color-dark-red").unwrap().value, 2);
        assert_eq!(color.enum_find("red").unwrap().value, 1);
        assert_eq!(color.enum_find("dark_red").unwrap().value, 2);
        assert!(color.enum_find("ED").is_none());
        assert!(color.enum_find("").is_none());
        assert_eq!(color.enum_find_value(-3).unwrap().ident, "COLOR_BLUE");
    }

    #[test]
    fn composite_accessors_are_kind_checked() {
        let map = color_map();
        let color = map.lookup_local("Color").unwrap();
        let point = map.lookup_local("Point").unwrap();
        assert_eq!(color.field_count(), 0);
        assert!(color.field(0).is_untyped());
        assert_eq!(point.enum_count(), 0);
        assert_eq!(point.prerequisite_count(), 0);
        assert_eq!(point.field_count(), 3);
        assert_eq!(point.field(1).name(), "y");
        assert!(point.field(3).is_untyped());
        assert_eq!(point.field_find("color").unwrap().origin(), "Color");
    }

    #[test]
    fn aux_and_hints() {
        let color = color_map().lookup_local("Color").unwrap();
        assert_eq!(color.aux_data(), vec!["hints=rw"]);
        assert_eq!(color.aux_value("hints"), Some("rw"));
        assert_eq!(color.aux_value("hint"), None);
        assert_eq!(color.hints(), ":rw:");
        assert_eq!(TypeCode::untyped().hints(), "::");
    }

    #[test]
    fn field_reference_resolves_locally() {
        let point = color_map().lookup_local("Point").unwrap();
        let color = point.field(2);
        assert_eq!(color.kind(), TypeKind::TypeReference);
        let resolved = color.resolve_local();
        assert_eq!(resolved.kind(), TypeKind::Enum);
        assert_eq!(resolved.name(), "Color");
    }

    #[test]
    fn pretty_lists_members() {
        let point = color_map().lookup_local("Point").unwrap();
        let text = point.pretty("");
        assert!(text.starts_with("RECORD Point\n"));
        assert!(text.contains("  FLOAT64 x\n"));
        assert!(text.contains("    -> Color\n"));
    }

    #[test]
    fn field_walk_visits_each_record_once() {
        let point = color_map().lookup_local("Point").unwrap();
        let mut walk = FieldWalk::new();
        assert_eq!(walk.fields(&point, 0).len(), 3);
        assert!(walk.fields(&point, 1).is_empty());
        assert!(FieldWalk::new().fields(&point.field(0), 0).is_empty());
    }

    #[test]
    fn tail_match_needs_word_boundary() {
        assert!(ident_tail_matches("COLOR_RED", "red"));
        assert!(!ident_tail_matches("COLOR_RED", "OR_RED"));
        assert!(!ident_tail_matches("RED", "RED"));
    }
}
