//! Deterministic key allocation for freshly built dictionaries.
//!
//! Keys count in base-26 over `a..z`. Incrementing past the last key of
//! the current length (`z`, `zz`, ...) grows the length by one and every
//! later allocation uses the new length; keys handed out earlier keep
//! their short form. Content is keyed first-seen-first in the canonical
//! traversal order, so identical content always lands on identical keys.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::model::{Key, Prefab, PrefabStack};

pub struct KeyAllocator {
    next: String,
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self {
            next: "a".to_string(),
        }
    }

    pub fn allocate(&mut self) -> Key {
        let key = Key::new(self.next.clone());
        self.next = increment(&self.next);
        key
    }
}

impl Default for KeyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

fn increment(key: &str) -> String {
    let mut bytes = key.as_bytes().to_vec();
    for i in (0..bytes.len()).rev() {
        if bytes[i] < b'z' {
            bytes[i] += 1;
            for slot in bytes.iter_mut().skip(i + 1) {
                *slot = b'a';
            }
            return String::from_utf8(bytes).expect("keys are ascii");
        }
    }
    // all z: grow the length
    "a".repeat(key.len() + 1)
}

/// Assigns dictionary keys by tile content, deduplicating identical stacks.
pub struct DictionaryBuilder {
    allocator: KeyAllocator,
    by_signature: HashMap<String, Key>,
    dictionary: BTreeMap<Key, PrefabStack>,
}

impl DictionaryBuilder {
    pub fn new() -> Self {
        Self {
            allocator: KeyAllocator::new(),
            by_signature: HashMap::new(),
            dictionary: BTreeMap::new(),
        }
    }

    /// The key for `stack`, allocating a new dictionary row the first time
    /// this content shows up in the pass. Deduplication keys on the content
    /// signature, so it never depends on the loaded environment.
    pub fn key_for(&mut self, stack: &[Arc<Prefab>]) -> Key {
        let signature = stack
            .iter()
            .map(|prefab| prefab.content_signature())
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(key) = self.by_signature.get(&signature) {
            return key.clone();
        }
        let key = self.allocator.allocate();
        self.by_signature.insert(signature, key.clone());
        self.dictionary.insert(key.clone(), stack.to_vec());
        key
    }

    pub fn into_dictionary(self) -> BTreeMap<Key, PrefabStack> {
        self.dictionary
    }
}

impl Default for DictionaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarSet;

    #[test]
    fn test_allocation_sequence() {
        let mut allocator = KeyAllocator::new();
        let keys: Vec<String> = (0..30)
            .map(|_| allocator.allocate().as_str().to_string())
            .collect();

        assert_eq!(keys[0], "a");
        assert_eq!(keys[1], "b");
        assert_eq!(keys[25], "z");
        // growth: the 27th key is two characters, earlier keys stay short
        assert_eq!(keys[26], "aa");
        assert_eq!(keys[27], "ab");
        assert_eq!(keys[29], "ad");
        assert!(keys[..26].iter().all(|k| k.len() == 1));
    }

    #[test]
    fn test_increment_carries() {
        let test_cases = vec![
            ("a", "b"),
            ("y", "z"),
            ("z", "aa"),
            ("az", "ba"),
            ("mz", "na"),
            ("zz", "aaa"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(increment(input), expected, "increment({input})");
        }
    }

    fn stack_of(path: &str) -> PrefabStack {
        vec![Arc::new(Prefab::new(path, Arc::new(VarSet::new())))]
    }

    #[test]
    fn test_builder_deduplicates_stacks() {
        let mut builder = DictionaryBuilder::new();
        let a = builder.key_for(&stack_of("/turf/floor"));
        let b = builder.key_for(&stack_of("/turf/space"));
        let again = builder.key_for(&stack_of("/turf/floor"));

        assert_eq!(a.as_str(), "a");
        assert_eq!(b.as_str(), "b");
        assert_eq!(again, a);

        let dictionary = builder.into_dictionary();
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary[&a][0].path(), "/turf/floor");
    }

    #[test]
    fn test_empty_stack_gets_its_own_row() {
        let mut builder = DictionaryBuilder::new();
        let empty = builder.key_for(&[]);
        let floor = builder.key_for(&stack_of("/turf/floor"));
        assert_ne!(empty, floor);
        assert_eq!(builder.key_for(&[]), empty);
    }

    #[test]
    fn test_27_distinct_stacks_grow_the_key_length() {
        let mut builder = DictionaryBuilder::new();
        let mut last = Key::new("");
        for i in 0..27 {
            last = builder.key_for(&stack_of(&format!("/obj/item{i}")));
        }
        assert_eq!(last.as_str(), "aa");

        let dictionary = builder.into_dictionary();
        assert_eq!(dictionary.len(), 27);
        assert_eq!(dictionary.keys().filter(|k| k.len() == 1).count(), 26);
    }
}
