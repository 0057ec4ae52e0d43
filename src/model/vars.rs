//! Variable sets: ordered name/value pairs with a prototype parent chain.
//!
//! A `VarSet` keeps its local pairs in insertion order (that order is what
//! the codec writes back out) and defers unset names to at most one parent
//! set. Sets are immutable once built: `modified` returns a fresh set, and
//! a parent can only be linked while building, so chains are acyclic by
//! construction. Values are opaque single-line DM literals (`"quoted"`,
//! numbers, type paths); nothing here interprets them.

use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct VarSet {
    vars: Vec<(String, String)>,
    parent: Option<Arc<VarSet>>,
}

impl VarSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs. A repeated name keeps its original position and
    /// takes the last value.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = Self::default();
        for (name, value) in pairs {
            set.put(name.into(), value.into());
        }
        set
    }

    /// Link the prototype this set defers unset names to. Consumes the set
    /// so the parent is fixed for its whole lifetime.
    pub fn with_parent(mut self, parent: Arc<VarSet>) -> Self {
        self.parent = Some(parent);
        self
    }

    fn put(&mut self, name: String, value: String) {
        if let Some(slot) = self.vars.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.vars.push((name, value));
        }
    }

    /// Resolve `name` locally first, then along the parent chain. A miss at
    /// the root is `None`, not an error.
    pub fn get(&self, name: &str) -> Option<&str> {
        let mut current = self;
        loop {
            if let Some((_, value)) = current.vars.iter().find(|(n, _)| n == name) {
                return Some(value);
            }
            match &current.parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Local pairs in insertion order.
    pub fn local_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn local_len(&self) -> usize {
        self.vars.len()
    }

    /// Copy of this set with `name` set to `value`. Replaces in place when
    /// the name exists locally, appends otherwise; keeps the same parent.
    pub fn modified(&self, name: &str, value: &str) -> VarSet {
        let mut next = self.clone();
        next.put(name.to_string(), value.to_string());
        next
    }

    /// The resolved mapping over the whole chain, sorted by name. Nearer
    /// sets shadow their parents.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut resolved: BTreeMap<String, String> = BTreeMap::new();
        let mut current = Some(self);
        while let Some(set) = current {
            for (name, value) in set.local_iter() {
                resolved
                    .entry(name.to_string())
                    .or_insert_with(|| value.to_string());
            }
            current = set.parent.as_deref();
        }
        resolved.into_iter().collect()
    }

    /// The resolved mapping rendered as `name=value;name=value`, the wire
    /// form used for `original_vars` snapshots.
    pub fn flatten_text(&self) -> String {
        let pairs: Vec<String> = self
            .flatten()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.join(";")
    }
}

/// Wrap `text` in quotes, escaping backslashes and embedded quotes.
pub fn quote_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Inverse of [`quote_text`]. Input that is not a quoted string comes back
/// unchanged.
pub fn unquote_text(text: &str) -> String {
    let Some(inner) = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return text.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

/// Split on `sep` occurrences that sit outside quoted runs. Escapes inside
/// quotes are honoured, so `a="x;y";b=1` splits into two segments.
pub fn split_unquoted(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' && in_quotes {
            escaped = true;
        } else if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}
