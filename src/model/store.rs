//! Interning store: one canonical `Arc<Prefab>` per structural identity.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::MapError;
use super::prefab::Prefab;
use super::PrefabId;

/// Owns every materialised prefab of one map. Interning keys on the
/// identity signature, so placeholders deduplicate like anything else:
/// their `original_path`/`original_vars` text is simply part of the
/// signature. The store only grows; ids start at 1 and stay stable for
/// the store's lifetime.
#[derive(Debug)]
pub struct PrefabStore {
    by_signature: HashMap<String, Arc<Prefab>>,
    by_id: HashMap<PrefabId, Arc<Prefab>>,
    next_id: PrefabId,
}

impl PrefabStore {
    pub fn new() -> Self {
        Self {
            by_signature: HashMap::new(),
            by_id: HashMap::new(),
            next_id: 1,
        }
    }

    /// Return the canonical prefab for `prefab`'s identity, registering it
    /// with the next sequential id on first sight. Whatever id the argument
    /// carried is ignored; identities belong to this store.
    pub fn intern(&mut self, prefab: Prefab) -> Arc<Prefab> {
        let signature = prefab.signature();
        if let Some(existing) = self.by_signature.get(&signature) {
            return existing.clone();
        }
        let id = self.next_id;
        self.next_id += 1;
        let interned = Arc::new(Prefab::with_id(
            id,
            prefab.path().to_string(),
            prefab.vars().clone(),
        ));
        self.by_signature.insert(signature, interned.clone());
        self.by_id.insert(id, interned.clone());
        interned
    }

    pub fn get(&self, id: PrefabId) -> Result<Arc<Prefab>, MapError> {
        self.by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| MapError::NotFound(format!("prefab id {id}")))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for PrefabStore {
    fn default() -> Self {
        Self::new()
    }
}
