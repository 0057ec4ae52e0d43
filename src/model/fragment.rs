//! Standalone map excerpts: the key dictionary plus the coordinate grid.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use super::prefab::Prefab;
use super::{Coord, MapSize};

/// One tile's stacked contents, bottom to top.
pub type PrefabStack = Vec<Arc<Prefab>>;

/// Short lowercase token naming one dictionary row. Keys order numerically,
/// base-26: by length first, then lexicographically, so `z < aa < ab`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(String);

impl Key {
    /// Callers guarantee lowercase ASCII; the decoder validates on read.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A serialisable rectangular excerpt of map content. Every grid entry
/// points at a dictionary row holding that tile's stack; coordinates are
/// 1-based. In-bounds coordinates missing from the grid are load-time gaps
/// and read as "no instances".
#[derive(Debug, Clone)]
pub struct MapFragment {
    pub size: MapSize,
    pub dictionary: BTreeMap<Key, PrefabStack>,
    pub grid: HashMap<Coord, Key>,
}

impl MapFragment {
    pub fn new(size: MapSize) -> Self {
        Self {
            size,
            dictionary: BTreeMap::new(),
            grid: HashMap::new(),
        }
    }

    /// The stack at `coord`; empty for gaps and out-of-bounds coordinates.
    pub fn prefabs_at(&self, coord: Coord) -> &[Arc<Prefab>] {
        self.grid
            .get(&coord)
            .and_then(|key| self.dictionary.get(key))
            .map(|stack| stack.as_slice())
            .unwrap_or(&[])
    }

    /// Length of the longest key, the grid field width when encoding. An
    /// empty dictionary still writes one-character fields.
    pub fn max_key_len(&self) -> usize {
        self.dictionary.keys().map(Key::len).max().unwrap_or(1)
    }

    /// In-bounds coordinates with no grid entry.
    pub fn gap_count(&self) -> usize {
        self.size.volume() - self.grid.len()
    }

    /// Structural equality per coordinate. Key strings are allowed to
    /// differ; gaps equal empty stacks.
    pub fn content_eq(&self, other: &MapFragment) -> bool {
        if self.size != other.size {
            return false;
        }
        self.size.iter_coords().all(|coord| {
            let ours = self.prefabs_at(coord);
            let theirs = other.prefabs_at(coord);
            ours.len() == theirs.len()
                && ours.iter().zip(theirs).all(|(a, b)| **a == **b)
        })
    }
}
