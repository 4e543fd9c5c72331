//! Listing decisions.

use serde::Serialize;

use crate::access::{AccessCache, AccessEvaluator};
use crate::entry::EntryKind;
use crate::hidden::HiddenSet;
use crate::locks::{LockState, LockStore};
use crate::path_key::PathKey;
use crate::rules::RuleEngine;

/// Decides whether an entry appears in a listing.
///
/// A matching rule decides outright, overriding the hidden set both ways.
/// Without a matching rule, an entry is visible unless it was hidden.
/// Accessibility is reported alongside but never changes the visibility
/// verdict.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityEvaluator<'a> {
    rules: &'a RuleEngine,
    hidden: &'a HiddenSet,
    access: AccessEvaluator<'a>,
    locks: &'a LockStore,
}

/// Everything a listing needs to know about one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryStatus {
    /// Canonical key of the entry.
    #[serde(serialize_with = "serialize_key")]
    pub key: PathKey,
    /// Whether the entry should be listed.
    pub visible: bool,
    /// Whether the entry's contents may be opened.
    pub accessible: bool,
    /// Lock state of the entry itself.
    pub lock_state: LockState,
}

fn serialize_key<S: serde::Serializer>(key: &PathKey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(key.as_str())
}

impl<'a> VisibilityEvaluator<'a> {
    /// Creates an evaluator over the given state.
    pub fn new(
        rules: &'a RuleEngine,
        hidden: &'a HiddenSet,
        locks: &'a LockStore,
        root: &'a PathKey,
    ) -> Self {
        Self {
            rules,
            hidden,
            access: AccessEvaluator::new(locks, root),
            locks,
        }
    }

    /// Whether the entry at `key`, listed under `name`, is visible.
    pub fn is_visible(&self, key: &PathKey, name: &str, kind: Option<EntryKind>) -> bool {
        match self.rules.evaluate_visibility(key, name, kind, self.locks) {
            Some(decision) => decision,
            None => !self.hidden.contains(key),
        }
    }

    /// Visibility, accessibility, and lock state of one entry.
    pub fn status(
        &self,
        key: &PathKey,
        name: &str,
        kind: Option<EntryKind>,
        cache: &mut AccessCache,
    ) -> EntryStatus {
        EntryStatus {
            key: key.clone(),
            visible: self.is_visible(key, name, kind),
            accessible: self.access.is_accessible_cached(key, cache),
            lock_state: self.locks.state(key),
        }
    }
}
