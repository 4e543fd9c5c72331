//! Access decisions along the ancestor chain.

use std::collections::HashMap;

use crate::locks::LockStore;
use crate::path_key::PathKey;

/// Per-refresh memo of access decisions, keyed by path.
///
/// Siblings share their parent's verdict, so a refresh that evaluates every
/// listed node touches each directory's lock state once.
pub type AccessCache = HashMap<PathKey, bool>;

/// Decides whether a path's contents may be opened.
///
/// A path is accessible when neither it nor any ancestor up to the root holds
/// a closed permanent lock or an unconsumed temporary lock.
#[derive(Debug, Clone, Copy)]
pub struct AccessEvaluator<'a> {
    locks: &'a LockStore,
    root: &'a PathKey,
}

impl<'a> AccessEvaluator<'a> {
    /// Creates an evaluator over `locks`, bounded by `root`.
    pub fn new(locks: &'a LockStore, root: &'a PathKey) -> Self {
        Self { locks, root }
    }

    /// Whether `key` is accessible.
    pub fn is_accessible(&self, key: &PathKey) -> bool {
        !key.chain_to(self.root)
            .iter()
            .any(|node| self.locks.blocks(node))
    }

    /// The first node in the chain that blocks access, nearest first.
    pub fn blocking_node(&self, key: &PathKey) -> Option<PathKey> {
        key.chain_to(self.root)
            .into_iter()
            .find(|node| self.locks.blocks(node))
    }

    /// Same as [`is_accessible`](Self::is_accessible), memoizing every node
    /// visited in `cache`.
    pub fn is_accessible_cached(&self, key: &PathKey, cache: &mut AccessCache) -> bool {
        let mut pending = Vec::new();
        let mut current = key.clone();

        let verdict = loop {
            if let Some(&known) = cache.get(&current) {
                break known;
            }
            if self.locks.blocks(&current) {
                pending.push(current);
                break false;
            }
            let stop = current == *self.root || current.is_root();
            let parent = current.parent();
            pending.push(current);
            match parent {
                Some(parent) if !stop => current = parent,
                _ => break true,
            }
        };

        // Every pending node sits below the node that produced the verdict.
        for node in pending {
            cache.insert(node, verdict);
        }
        verdict
    }
}
