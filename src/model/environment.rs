//! The type-environment collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use super::vars::VarSet;

/// Read-only view of the loaded object-type database. The engine only ever
/// asks two questions: does a path exist, and what are its default vars.
/// Parsing a real environment lives with the caller.
pub trait TypeEnvironment {
    fn contains(&self, path: &str) -> bool;

    /// Default variable set for `path`; `None` when the path does not
    /// resolve.
    fn default_vars(&self, path: &str) -> Option<Arc<VarSet>>;
}

/// Table-backed environment for tests and for callers that resolve their
/// type database elsewhere.
#[derive(Debug, Default)]
pub struct StaticEnvironment {
    types: HashMap<String, Arc<VarSet>>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, defaults: VarSet) {
        self.types.insert(path.into(), Arc::new(defaults));
    }

    pub fn with_type(mut self, path: impl Into<String>, defaults: VarSet) -> Self {
        self.insert(path, defaults);
        self
    }
}

impl TypeEnvironment for StaticEnvironment {
    fn contains(&self, path: &str) -> bool {
        self.types.contains_key(path)
    }

    fn default_vars(&self, path: &str) -> Option<Arc<VarSet>> {
        self.types.get(path).cloned()
    }
}
