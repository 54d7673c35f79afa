//! Name resolution across loaded maps.
//!
//! A `TypeRegistry` is explicit process state: create one at startup, pass
//! it to whoever needs global name resolution, and call
//! [`TypeRegistry::shutdown`] (or drop it) when done. Lookups search the
//! registered maps in registration order and fall back to the builtins.

use std::path::Path;

use parking_lot::RwLock;

use super::{Limits, TypeCode, TypeMap};

pub struct TypeRegistry {
    maps: RwLock<Vec<TypeMap>>,
    limits: Limits,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            maps: RwLock::new(Vec::new()),
            limits,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load a map from `path` and register it when valid.
    ///
    /// The returned map is an error map on failure, exactly like
    /// [`TypeMap::load_local`].
    pub fn load(&self, path: impl AsRef<Path>) -> TypeMap {
        let map = TypeMap::load_local_with_limits(path, &self.limits);
        if map.is_ok() {
            self.add(&map);
        }
        map
    }

    /// Register `map`; returns false for error maps and for blobs already
    /// registered (same digest).
    pub fn add(&self, map: &TypeMap) -> bool {
        let Some(digest) = map.digest() else {
            return false;
        };
        let mut maps = self.maps.write();
        if maps.iter().any(|m| m.digest() == Some(digest)) {
            log::debug!("type map {} already registered", digest);
            return false;
        }
        maps.push(map.clone());
        log::debug!("registered type map {} ({} maps)", digest, maps.len());
        true
    }

    pub fn remove(&self, map: &TypeMap) -> bool {
        let mut maps = self.maps.write();
        let before = maps.len();
        maps.retain(|m| !m.same_map(map));
        maps.len() != before
    }

    /// Snapshot of the registered maps, in registration order.
    pub fn maps(&self) -> Vec<TypeMap> {
        self.maps.read().clone()
    }

    pub fn len(&self) -> usize {
        self.maps.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.read().is_empty()
    }

    /// Resolve `name` against every registered map, then the builtins.
    pub fn lookup(&self, name: &str) -> Option<TypeCode> {
        let found = {
            let maps = self.maps.read();
            maps.iter().find_map(|map| map.lookup_local(name))
        };
        found.or_else(|| TypeMap::builtins().lookup_local(name))
    }

    pub fn builtins(&self) -> TypeMap {
        TypeMap::builtins()
    }

    /// Drop every registered map. Type codes handed out earlier stay valid.
    pub fn shutdown(&self) {
        let dropped = std::mem::take(&mut *self.maps.write());
        log::debug!("type registry shut down, released {} maps", dropped.len());
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aida_format::{encode, TypeDecl, TypeKind};

    fn map_of(decls: &[TypeDecl]) -> TypeMap {
        TypeMap::from_bytes(encode(decls).unwrap()).unwrap()
    }

    #[test]
    fn lookup_falls_back_to_builtins() {
        let registry = TypeRegistry::new();
        let t = registry.lookup("int32").unwrap();
        assert_eq!(t.kind(), TypeKind::Int32);
        assert!(registry.lookup("Missing").is_none());
    }

    #[test]
    fn registration_order_wins() {
        let registry = TypeRegistry::new();
        let first = map_of(&[TypeDecl::new("Thing", TypeKind::Bool)]);
        let second = map_of(&[TypeDecl::new("Thing", TypeKind::String)]);
        assert!(registry.add(&first));
        assert!(registry.add(&second));
        assert_eq!(registry.lookup("Thing").unwrap().kind(), TypeKind::Bool);

        assert!(registry.remove(&first));
        assert!(!registry.remove(&first));
        assert_eq!(registry.lookup("Thing").unwrap().kind(), TypeKind::String);
    }

    #[test]
    fn duplicates_and_error_maps_are_refused() {
        let registry = TypeRegistry::new();
        let map = map_of(&[TypeDecl::new("Thing", TypeKind::Bool)]);
        let twin = map_of(&[TypeDecl::new("Thing", TypeKind::Bool)]);
        assert!(registry.add(&map));
        assert!(!registry.add(&twin));
        assert!(!registry.add(&TypeMap::load_local("/nonexistent/aida.map")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn shutdown_keeps_handed_out_codes() {
        let registry = TypeRegistry::new();
        registry.add(&map_of(&[TypeDecl::new("Thing", TypeKind::Int64)]));
        let thing = registry.lookup("Thing").unwrap();
        registry.shutdown();
        assert!(registry.is_empty());
        assert!(registry.lookup("Thing").is_none());
        assert_eq!(thing.kind(), TypeKind::Int64);
        assert_eq!(thing.name(), "Thing");
    }

    #[test]
    fn resolve_crosses_maps() {
        let registry = TypeRegistry::new();
        let base = map_of(&[TypeDecl::new("Base", TypeKind::Float64)]);
        let user = map_of(&[
            TypeDecl::reference("Alias", "Base"),
            TypeDecl::reference("Loop", "Loop"),
            TypeDecl::reference("Count", "int32"),
        ]);
        registry.add(&base);
        registry.add(&user);

        let alias = user.lookup_local("Alias").unwrap();
        assert!(alias.resolve_local().is_untyped());
        assert_eq!(alias.resolve(&registry).kind(), TypeKind::Float64);

        let count = user.lookup_local("Count").unwrap();
        assert_eq!(count.resolve_local().kind(), TypeKind::Int32);

        let cyclic = user.lookup_local("Loop").unwrap();
        assert!(cyclic.resolve(&registry).is_untyped());
        assert!(user.has_structural_error());
    }
}
