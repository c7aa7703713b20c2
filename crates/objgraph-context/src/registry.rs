//! Object registries ("graph managers").
//!
//! A registry maps object ids to live objects. The merge engine only needs
//! identifier lookup and registration, so that is all the traits ask for:
//!
//! - `NodeLookup`: read-only `get_node`, enough for a merge source
//! - `GraphManager`: adds registration and the registry's ownership token
//!
//! Two implementations:
//!
//! - `ObjectStore`: plain single-owner map, used inside `ObjectContext`
//! - `SharedObjectStore`: internally synchronized (dashmap), cheap to clone,
//!   for a registry shared between sessions

use ahash::AHashMap;
use dashmap::DashMap;
use objgraph_model::{ObjectHandle, ObjectId, RegistryToken};
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::Arc;

pub trait NodeLookup {
    fn get_node(&self, id: &ObjectId) -> Option<ObjectHandle>;
}

pub trait GraphManager: NodeLookup {
    /// Token written into every object this registry owns.
    fn token(&self) -> RegistryToken;

    fn register_node(&mut self, id: ObjectId, object: ObjectHandle);

    fn unregister_node(&mut self, id: &ObjectId) -> Option<ObjectHandle>;
}

impl<S: BuildHasher> NodeLookup for HashMap<ObjectId, ObjectHandle, S> {
    fn get_node(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.get(id).cloned()
    }
}

// ============================================================================
// ObjectStore
// ============================================================================

pub struct ObjectStore {
    token: RegistryToken,
    nodes: AHashMap<ObjectId, ObjectHandle>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            token: RegistryToken::new(),
            nodes: AHashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &ObjectHandle)> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.nodes.keys()
    }

    /// Move the object registered under `from` to `to`. Returns false if
    /// nothing was registered under `from`.
    pub fn rekey(&mut self, from: &ObjectId, to: ObjectId) -> bool {
        match self.nodes.remove(from) {
            Some(object) => {
                self.nodes.insert(to, object);
                true
            }
            None => false,
        }
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStore")
            .field("token", &self.token)
            .field("len", &self.nodes.len())
            .finish()
    }
}

impl NodeLookup for ObjectStore {
    fn get_node(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.nodes.get(id).cloned()
    }
}

impl GraphManager for ObjectStore {
    fn token(&self) -> RegistryToken {
        self.token
    }

    fn register_node(&mut self, id: ObjectId, object: ObjectHandle) {
        self.nodes.insert(id, object);
    }

    fn unregister_node(&mut self, id: &ObjectId) -> Option<ObjectHandle> {
        self.nodes.remove(id)
    }
}

// ============================================================================
// SharedObjectStore
// ============================================================================

/// Registry shared between sessions. Clones share contents and token.
#[derive(Clone)]
pub struct SharedObjectStore {
    token: RegistryToken,
    nodes: Arc<DashMap<ObjectId, ObjectHandle>>,
}

impl SharedObjectStore {
    pub fn new() -> Self {
        Self {
            token: RegistryToken::new(),
            nodes: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register through a shared reference.
    pub fn insert(&self, id: ObjectId, object: ObjectHandle) -> Option<ObjectHandle> {
        self.nodes.insert(id, object)
    }

    pub fn remove(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.nodes.remove(id).map(|(_, object)| object)
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.nodes.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for SharedObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedObjectStore")
            .field("token", &self.token)
            .field("len", &self.nodes.len())
            .finish()
    }
}

impl NodeLookup for SharedObjectStore {
    fn get_node(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.nodes.get(id).map(|entry| Arc::clone(entry.value()))
    }
}

impl GraphManager for SharedObjectStore {
    fn token(&self) -> RegistryToken {
        self.token
    }

    fn register_node(&mut self, id: ObjectId, object: ObjectHandle) {
        self.insert(id, object);
    }

    fn unregister_node(&mut self, id: &ObjectId) -> Option<ObjectHandle> {
        self.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objgraph_model::{into_handle, DataObject};

    fn artist(n: i64) -> (ObjectId, ObjectHandle) {
        let id = ObjectId::permanent("Artist", "ID", n);
        let handle = into_handle(DataObject::with_id("Artist", id.clone()));
        (id, handle)
    }

    #[test]
    fn test_object_store_register_and_rekey() {
        let mut store = ObjectStore::with_capacity(4);
        let temp = ObjectId::temporary("Artist");
        let (permanent, handle) = artist(1);

        store.register_node(temp.clone(), Arc::clone(&handle));
        assert!(store.contains(&temp));

        assert!(store.rekey(&temp, permanent.clone()));
        assert!(!store.contains(&temp));
        assert!(Arc::ptr_eq(&store.get_node(&permanent).unwrap(), &handle));
        assert!(!store.rekey(&temp, permanent.clone()));

        assert!(store.unregister_node(&permanent).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_stores_have_distinct_tokens() {
        let a = ObjectStore::new();
        let b = ObjectStore::new();
        assert_ne!(a.token(), b.token());

        let shared = SharedObjectStore::new();
        assert_eq!(shared.clone().token(), shared.token());
    }

    #[test]
    fn test_shared_store_is_visible_across_clones_and_threads() {
        let store = SharedObjectStore::new();

        std::thread::scope(|scope| {
            for worker in 0..4i64 {
                let store = store.clone();
                scope.spawn(move || {
                    for i in 0..25 {
                        let (id, handle) = artist(worker * 100 + i);
                        store.insert(id, handle);
                    }
                });
            }
        });

        assert_eq!(store.len(), 100);
        let (id, _) = artist(301);
        assert!(store.get_node(&id).is_some());
        assert_eq!(store.ids().len(), 100);
    }
}
