//! Binary type maps
//!
//! Loads and validates blobs produced by the offline generator and exposes
//! read-only views into them:
//!
//! - [`TypeMap`] - one loaded blob, enumerates its top-level types
//! - [`TypeCode`] - a view of one type record, shares ownership of the blob
//! - [`TypeRegistry`] - name resolution across several maps plus builtins
//!
//! Load failures never produce partial data: the returned map carries an
//! errno-shaped status and no types. Structural problems found later, deep
//! inside an accepted blob, make the individual accessor return an empty or
//! untyped result and set a sticky flag on the map.

mod blob;
mod builtins;
mod code;
pub mod registry;

pub use aida_format::{BlobDigest, TypeKind};
pub use blob::{BlobError, Segment};
pub use builtins::builtin_declarations;
pub(crate) use builtins::builtin_for;
pub use code::{EnumValue, FieldWalk, TypeCode};
pub use registry::TypeRegistry;

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use blob::Blob;

/// Resource limits applied while loading and walking a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted blob, in bytes.
    pub max_blob_size: usize,
    /// Longest type-reference chain `resolve` follows.
    pub max_reference_depth: usize,
    /// Largest accepted index list.
    pub max_list_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_blob_size: 64 * 1024 * 1024,
            max_reference_depth: 64,
            max_list_len: 1_000_000,
        }
    }
}

/// Why a map could not be loaded.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid type map: {0}")]
    Format(#[from] BlobError),
}

impl LoadError {
    /// The errno-shaped status stored on error maps.
    pub fn errno(&self) -> i32 {
        match self {
            LoadError::Io { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => libc::ENOENT,
                _ => source.raw_os_error().unwrap_or(libc::EIO),
            },
            LoadError::Format(BlobError::Truncated { .. }) => libc::ENODATA,
            LoadError::Format(BlobError::TooLarge { .. }) => libc::EFBIG,
            LoadError::Format(_) => libc::ENOEXEC,
        }
    }
}

/// Shared owner of one validated blob.
pub(crate) struct MapHandle {
    blob: Blob,
    limits: Limits,
    digest: BlobDigest,
    origin: Option<PathBuf>,
    structural_error: AtomicBool,
}

impl MapHandle {
    fn new(
        bytes: Cow<'static, [u8]>,
        limits: &Limits,
        origin: Option<PathBuf>,
    ) -> Result<Arc<MapHandle>, BlobError> {
        let blob = Blob::parse(bytes, limits)?;
        let digest = BlobDigest::of(blob.declared());
        Ok(Arc::new(MapHandle {
            blob,
            limits: *limits,
            digest,
            origin,
            structural_error: AtomicBool::new(false),
        }))
    }

    pub(crate) fn blob(&self) -> &Blob {
        &self.blob
    }

    pub(crate) fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Turn a failed access into `None`, remembering that the map is damaged.
    pub(crate) fn checked<T>(&self, result: Result<T, BlobError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.structural_error.store(true, Ordering::Relaxed);
                log::warn!("type map {}: {}", self.digest, err);
                None
            }
        }
    }

    pub(crate) fn flag_error(&self) {
        self.structural_error.store(true, Ordering::Relaxed);
    }

    fn top_level(&self) -> Vec<u32> {
        self.checked(self.blob.list(self.blob.header().types))
            .map(|list| list.iter().collect())
            .unwrap_or_default()
    }

    /// First top-level type whose name equals `name` byte for byte.
    pub(crate) fn lookup(self: &Arc<Self>, name: &str) -> Option<TypeCode> {
        let list = self.checked(self.blob.list(self.blob.header().types))?;
        list.iter()
            .find(|&offset| {
                self.checked(self.blob.record(offset))
                    .and_then(|record| self.checked(self.blob.string(record.name)))
                    .map_or(false, |n| n.as_bytes() == name.as_bytes())
            })
            .map(|offset| TypeCode::new(Arc::clone(self), offset))
    }
}

/// One loaded type map, or the status of a failed load.
#[derive(Clone)]
pub struct TypeMap {
    handle: Option<Arc<MapHandle>>,
    status: i32,
}

impl TypeMap {
    fn error(status: i32) -> Self {
        Self {
            handle: None,
            status,
        }
    }

    fn from_handle(handle: Arc<MapHandle>) -> Self {
        Self {
            handle: Some(handle),
            status: 0,
        }
    }

    /// Load a map from a file without registering it anywhere.
    ///
    /// Failures come back as an error map, see [`TypeMap::error_status`].
    pub fn load_local(path: impl AsRef<Path>) -> TypeMap {
        Self::load_local_with_limits(path, &Limits::default())
    }

    pub fn load_local_with_limits(path: impl AsRef<Path>, limits: &Limits) -> TypeMap {
        let path = path.as_ref();
        match Self::try_load(path, limits) {
            Ok(map) => map,
            Err(err) => {
                log::warn!("rejecting type map {}: {}", path.display(), err);
                TypeMap::error(err.errno())
            }
        }
    }

    /// Load a map from a file, reporting the typed error.
    pub fn try_load(path: impl AsRef<Path>, limits: &Limits) -> Result<TypeMap, LoadError> {
        let path = path.as_ref();
        let io_err = |source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let size = std::fs::metadata(path).map_err(io_err)?.len();
        if size > limits.max_blob_size as u64 {
            return Err(LoadError::Format(BlobError::TooLarge {
                size: usize::try_from(size).unwrap_or(usize::MAX),
                limit: limits.max_blob_size,
            }));
        }
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let handle = MapHandle::new(Cow::Owned(bytes), limits, Some(path.to_path_buf()))?;
        let map = TypeMap::from_handle(handle);
        log::debug!(
            "loaded type map {} ({} types) from {}",
            map.digest().map(|d| d.to_string()).unwrap_or_default(),
            map.type_count(),
            path.display()
        );
        Ok(map)
    }

    /// Validate an in-memory blob.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<TypeMap, LoadError> {
        Self::from_bytes_with_limits(bytes, &Limits::default())
    }

    pub fn from_bytes_with_limits(bytes: Vec<u8>, limits: &Limits) -> Result<TypeMap, LoadError> {
        let handle = MapHandle::new(Cow::Owned(bytes), limits, None)?;
        Ok(TypeMap::from_handle(handle))
    }

    pub(crate) fn from_static(bytes: &'static [u8]) -> Result<TypeMap, LoadError> {
        let handle = MapHandle::new(Cow::Borrowed(bytes), &Limits::default(), None)?;
        Ok(TypeMap::from_handle(handle))
    }

    /// Zero for a valid map, otherwise an errno value describing the failure.
    pub fn error_status(&self) -> i32 {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.handle.is_some()
    }

    /// True once any accessor hit a structural problem in this map.
    pub fn has_structural_error(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |h| h.structural_error.load(Ordering::Relaxed))
    }

    pub fn type_count(&self) -> usize {
        self.handle.as_ref().map_or(0, |h| {
            h.checked(h.blob.list(h.blob.header().types))
                .map_or(0, |list| list.len())
        })
    }

    /// The `index`-th top-level type, untyped when out of range.
    pub fn type_at(&self, index: usize) -> TypeCode {
        let Some(handle) = &self.handle else {
            return TypeCode::untyped();
        };
        let offset = handle
            .checked(handle.blob.list(handle.blob.header().types))
            .and_then(|list| list.get(index));
        match offset {
            Some(offset) => TypeCode::new(Arc::clone(handle), offset),
            None => TypeCode::untyped(),
        }
    }

    pub fn types(&self) -> impl Iterator<Item = TypeCode> + '_ {
        let offsets = self.handle.as_ref().map(|h| h.top_level()).unwrap_or_default();
        offsets.into_iter().filter_map(move |offset| {
            self.handle
                .as_ref()
                .map(|handle| TypeCode::new(Arc::clone(handle), offset))
        })
    }

    /// Find a top-level type by exact name; the first match wins.
    pub fn lookup_local(&self, name: &str) -> Option<TypeCode> {
        self.handle.as_ref()?.lookup(name)
    }

    pub fn digest(&self) -> Option<BlobDigest> {
        self.handle.as_ref().map(|h| h.digest)
    }

    /// File the map was loaded from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.handle.as_ref()?.origin.as_deref()
    }

    /// True when both values refer to the same loaded blob.
    pub fn same_map(&self, other: &TypeMap) -> bool {
        match (&self.handle, &other.handle) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for TypeMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.handle {
            Some(handle) => f
                .debug_struct("TypeMap")
                .field("digest", &handle.digest.to_string())
                .field("types", &self.type_count())
                .finish(),
            None => f
                .debug_struct("TypeMap")
                .field("error_status", &self.status)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aida_format::{encode, TypeDecl};

    #[test]
    fn error_map_is_empty() {
        let map = TypeMap::error(libc::ENOENT);
        assert!(!map.is_ok());
        assert_eq!(map.type_count(), 0);
        assert!(map.type_at(0).is_untyped());
        assert!(map.lookup_local("anything").is_none());
        assert!(map.digest().is_none());
    }

    #[test]
    fn errno_mapping() {
        let missing = LoadError::Io {
            path: PathBuf::from("/nonexistent"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(missing.errno(), libc::ENOENT);
        assert_eq!(
            LoadError::Format(BlobError::Truncated { have: 3 }).errno(),
            libc::ENODATA
        );
        assert_eq!(LoadError::Format(BlobError::BadMagic).errno(), libc::ENOEXEC);
    }

    #[test]
    fn lookup_is_exact_and_first_match_wins() {
        let bytes = encode(&[
            TypeDecl::new("dup", TypeKind::Bool),
            TypeDecl::new("dup", TypeKind::Int64),
            TypeDecl::new("dupe", TypeKind::String),
        ])
        .unwrap();
        let map = TypeMap::from_bytes(bytes).unwrap();
        assert_eq!(map.lookup_local("dup").unwrap().kind(), TypeKind::Bool);
        assert_eq!(map.lookup_local("dupe").unwrap().kind(), TypeKind::String);
        assert!(map.lookup_local("du").is_none());
        assert!(map.lookup_local("DUP").is_none());
    }

    #[test]
    fn type_at_walks_the_top_level_list() {
        let bytes = encode(&[
            TypeDecl::new("a", TypeKind::Bool),
            TypeDecl::new("b", TypeKind::Int64),
            TypeDecl::new("c", TypeKind::String),
        ])
        .unwrap();
        let map = TypeMap::from_bytes(bytes).unwrap();
        assert_eq!(map.type_count(), 3);
        let names: Vec<String> = (0..map.type_count())
            .map(|i| map.type_at(i).name().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        let listed: Vec<TypeCode> = map.types().collect();
        let indexed: Vec<TypeCode> = (0..3).map(|i| map.type_at(i)).collect();
        assert_eq!(listed, indexed);
        assert!(map.type_at(3).is_untyped());
        assert!(map.type_at(usize::MAX).is_untyped());
    }

    #[test]
    fn clones_share_the_blob() {
        let map = TypeMap::from_bytes(encode(&[]).unwrap()).unwrap();
        let other = map.clone();
        assert!(map.same_map(&other));
        assert_eq!(map.digest(), other.digest());
    }
}
