//! Identifier registry (§4.1): interns class hashes and method hashes
//! behind dense integer indices so every downstream structure is
//! value-typed instead of holding owning references to each other.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

/// Literal prefix used to encode a library type as a class id (§6).
pub const LIBRARY_PREFIX: &str = "LIB";
pub const LIBRARY_SEPARATOR: char = ':';

/// Stable string hash identifying a class, interned behind a [`ClassIndex`].
///
/// Library types are encoded as `LIB:<fully-qualified-name>` so they can be
/// interned and participate in the same maps as source types without ever
/// being walked for declarations.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ClassId(pub std::sync::Arc<str>);

impl ClassId {
    pub fn new(raw: impl Into<std::sync::Arc<str>>) -> Self {
        Self(raw.into())
    }

    pub fn library(qualified_name: &str) -> Self {
        Self(format!("{LIBRARY_PREFIX}{LIBRARY_SEPARATOR}{qualified_name}").into())
    }

    pub fn is_library(&self) -> bool {
        self.0
            .strip_prefix(LIBRARY_PREFIX)
            .and_then(|rest| rest.strip_prefix(LIBRARY_SEPARATOR))
            .is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable string hash identifying a method, interned behind a [`MethodIndex`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct MethodHash(pub std::sync::Arc<str>);

impl MethodHash {
    pub fn new(raw: impl Into<std::sync::Arc<str>>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dense integer index assigned to a [`ClassId`] on first reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ClassIndex(pub u32);

impl ClassIndex {
    pub const INVALID: ClassIndex = ClassIndex(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Dense integer index assigned to a [`MethodHash`] on first reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct MethodIndex(pub u32);

impl MethodIndex {
    pub const INVALID: MethodIndex = MethodIndex(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Concurrent, idempotent interning of class and method identifiers.
///
/// `update_or_get_bit_index` is the one operation the concurrency model
/// (§5) calls out as requiring strict atomicity: concurrent first
/// assignments for the same id must produce a single index. `DashMap`'s
/// `entry` API locks the owning shard for the duration of the closure,
/// which gives us that without a separate global mutex.
#[derive(Default)]
pub struct IdentifierRegistry {
    class_index_counter: AtomicU32,
    method_index_counter: AtomicU32,
    class_ids: DashMap<ClassId, ClassIndex>,
    class_index_to_id: DashMap<ClassIndex, ClassId>,
    class_signatures: DashMap<ClassIndex, String>,
    method_hashes: DashMap<MethodHash, MethodIndex>,
    method_index_to_hash: DashMap<MethodIndex, MethodHash>,
    method_signatures: DashMap<MethodIndex, String>,
    binding_hash_to_class: DashMap<String, ClassId>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: returns the existing index if `id` was already interned,
    /// otherwise atomically allocates the next one.
    pub fn update_or_get_bit_index(&self, id: &ClassId) -> ClassIndex {
        if let Some(existing) = self.class_ids.get(id) {
            return *existing;
        }
        *self.class_ids.entry(id.clone()).or_insert_with(|| {
            let index = ClassIndex(self.class_index_counter.fetch_add(1, Ordering::SeqCst));
            self.class_index_to_id.insert(index, id.clone());
            index
        })
    }

    /// Interns a class id together with its human-readable signature. The
    /// signature is recorded only on first interning.
    pub fn intern_class(&self, id: &ClassId, signature: &str) -> ClassIndex {
        let index = self.update_or_get_bit_index(id);
        self.class_signatures
            .entry(index)
            .or_insert_with(|| signature.to_string());
        index
    }

    pub fn update_or_get_method_index(&self, hash: &MethodHash) -> MethodIndex {
        if let Some(existing) = self.method_hashes.get(hash) {
            return *existing;
        }
        *self.method_hashes.entry(hash.clone()).or_insert_with(|| {
            let index = MethodIndex(self.method_index_counter.fetch_add(1, Ordering::SeqCst));
            self.method_index_to_hash.insert(index, hash.clone());
            index
        })
    }

    pub fn intern_method(&self, hash: &MethodHash, signature: &str) -> MethodIndex {
        let index = self.update_or_get_method_index(hash);
        self.method_signatures
            .entry(index)
            .or_insert_with(|| signature.to_string());
        index
    }

    pub fn class_from_index(&self, index: ClassIndex) -> Option<ClassId> {
        self.class_index_to_id.get(&index).map(|v| v.clone())
    }

    pub fn index_from_class(&self, id: &ClassId) -> ClassIndex {
        self.class_ids
            .get(id)
            .map(|v| *v)
            .unwrap_or(ClassIndex::INVALID)
    }

    pub fn method_from_index(&self, index: MethodIndex) -> Option<MethodHash> {
        self.method_index_to_hash.get(&index).map(|v| v.clone())
    }

    pub fn index_from_method(&self, hash: &MethodHash) -> MethodIndex {
        self.method_hashes
            .get(hash)
            .map(|v| *v)
            .unwrap_or(MethodIndex::INVALID)
    }

    pub fn class_signature(&self, index: ClassIndex) -> Option<String> {
        self.class_signatures.get(&index).map(|v| v.clone())
    }

    pub fn method_signature(&self, index: MethodIndex) -> Option<String> {
        self.method_signatures.get(&index).map(|v| v.clone())
    }

    /// Records that `binding_hash` names `class_id`, for recovering a class
    /// id from a binding whose token-range could not be read. Anonymous
    /// bindings must not be inserted here (they collide).
    pub fn record_binding(&self, binding_hash: &str, class_id: ClassId) {
        self.binding_hash_to_class
            .insert(binding_hash.to_string(), class_id);
    }

    pub fn class_from_binding(&self, binding_hash: &str) -> Option<ClassId> {
        self.binding_hash_to_class
            .get(binding_hash)
            .map(|v| v.clone())
    }

    pub fn class_count(&self) -> usize {
        self.class_ids.len()
    }

    pub fn method_count(&self) -> usize {
        self.method_hashes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn bit_index_is_idempotent() {
        let registry = IdentifierRegistry::new();
        let id = ClassId::new("com.example.Foo");
        let first = registry.update_or_get_bit_index(&id);
        let second = registry.update_or_get_bit_index(&id);
        assert_eq!(first, second);
    }

    #[test]
    fn concurrent_first_assignment_yields_single_index() {
        let registry = Arc::new(IdentifierRegistry::new());
        let id = ClassId::new("com.example.Shared");
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                let id = id.clone();
                thread::spawn(move || registry.update_or_get_bit_index(&id))
            })
            .collect();
        let indices: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(indices.iter().all(|i| *i == indices[0]));
        assert_eq!(registry.class_count(), 1);
    }

    #[test]
    fn missing_lookup_returns_sentinel() {
        let registry = IdentifierRegistry::new();
        let missing = ClassId::new("com.example.Missing");
        assert_eq!(registry.index_from_class(&missing), ClassIndex::INVALID);
        assert!(registry.class_from_index(ClassIndex(0)).is_none());
    }

    #[test]
    fn library_class_id_round_trips() {
        let id = ClassId::library("java.util.List");
        assert!(id.is_library());
        assert_eq!(id.as_str(), "LIB:java.util.List");
        assert!(!ClassId::new("com.example.Foo").is_library());
    }

    #[test]
    fn index_from_class_of_class_from_index_is_identity() {
        let registry = IdentifierRegistry::new();
        let id = ClassId::new("com.example.Foo");
        let index = registry.intern_class(&id, "Lcom/example/Foo;");
        let recovered = registry.class_from_index(index).unwrap();
        assert_eq!(registry.index_from_class(&recovered), index);
    }
}
