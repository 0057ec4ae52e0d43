//! The prefab value type: a type path plus its variable set.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::vars::VarSet;
use super::{ID_NONE, PrefabId};

/// One stackable thing on a tile. Immutable; the id is assigned by the
/// owning [`PrefabStore`](super::store::PrefabStore) and stays `ID_NONE`
/// until the prefab is interned.
#[derive(Debug, Clone)]
pub struct Prefab {
    id: PrefabId,
    path: String,
    vars: Arc<VarSet>,
}

impl Prefab {
    pub fn new(path: impl Into<String>, vars: Arc<VarSet>) -> Self {
        Self {
            id: ID_NONE,
            path: path.into(),
            vars,
        }
    }

    pub(crate) fn with_id(id: PrefabId, path: String, vars: Arc<VarSet>) -> Self {
        Self { id, path, vars }
    }

    pub fn id(&self) -> PrefabId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn vars(&self) -> &Arc<VarSet> {
        &self.vars
    }

    /// Identity signature: path plus the flattened (chain-resolved) vars.
    /// Equal signatures mean "the same prefab" to the store, whatever the
    /// ids say.
    pub fn signature(&self) -> String {
        format!("{}{{{}}}", self.path, self.vars.flatten_text())
    }

    /// Content signature: path plus the local vars only, sorted by name.
    /// Dictionary deduplication keys on this so row reuse never depends on
    /// which environment happens to be loaded.
    pub fn content_signature(&self) -> String {
        let mut pairs: Vec<(&str, &str)> = self.vars.local_iter().collect();
        pairs.sort();
        let rendered: Vec<String> = pairs
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        format!("{}{{{}}}", self.path, rendered.join(";"))
    }
}

impl PartialEq for Prefab {
    fn eq(&self, other: &Self) -> bool {
        self.signature() == other.signature()
    }
}

impl Eq for Prefab {}

impl Hash for Prefab {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature().hash(state);
    }
}
