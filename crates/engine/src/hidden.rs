//! Explicitly hidden paths.

use std::collections::HashSet;

use crate::path_key::PathKey;

/// Paths suppressed from listings, independent of lock state.
///
/// The set only grows; there is no way to unhide a path short of starting a
/// new session.
#[derive(Debug, Default, Clone)]
pub struct HiddenSet {
    keys: HashSet<PathKey>,
}

impl HiddenSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hides `key`. Returns false if it was already hidden.
    pub fn hide(&mut self, key: PathKey) -> bool {
        self.keys.insert(key)
    }

    /// Whether `key` is hidden.
    pub fn contains(&self, key: &PathKey) -> bool {
        self.keys.contains(key)
    }

    /// Number of hidden paths.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing is hidden.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Hidden keys in sorted order.
    pub fn sorted(&self) -> Vec<&PathKey> {
        let mut keys: Vec<&PathKey> = self.keys.iter().collect();
        keys.sort();
        keys
    }
}
