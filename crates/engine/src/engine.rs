//! The engine state object.
//!
//! [`Engine`] owns all lock, hidden, and rule state for one session and
//! exposes the operations a host shell calls. Queries are pure functions of
//! that state. Mutations only touch the lock store or hidden set; changed lock
//! tiers are tracked until [`Engine::save_pending`] writes them out.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::access::{AccessCache, AccessEvaluator};
use crate::entry::{EntryKind, TreeEntry};
use crate::error::{EngineError, Result};
use crate::hidden::HiddenSet;
use crate::locks::{LockKind, LockState, LockStore, UnlockResult};
use crate::path_key::{PathKey, PathNormalizer, PathStyle};
use crate::provider::{ListingProvider, LockPersistence};
use crate::rules::{parse_rules, Rule, RuleEngine};
use crate::visibility::{EntryStatus, VisibilityEvaluator};

/// Number of locks loaded per tier at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Permanent locks loaded.
    pub permanent: usize,
    /// Temporary locks loaded.
    pub temporary: usize,
}

/// Access-control and conditional-visibility engine for one browsing session.
pub struct Engine<L, P> {
    normalizer: PathNormalizer,
    root_path: PathBuf,
    root: PathKey,
    locks: LockStore,
    hidden: HiddenSet,
    rules: RuleEngine,
    rule_source: String,
    listing: L,
    persistence: P,
    dirty: BTreeSet<LockKind>,
}

impl<L: ListingProvider, P: LockPersistence> Engine<L, P> {
    /// Creates an engine rooted at `root`. Relative paths passed to the
    /// engine resolve against the root.
    ///
    /// Nothing is loaded; call [`load_locks`](Self::load_locks) and
    /// [`reload_rules`](Self::reload_rules).
    pub fn new<R: AsRef<Path>>(root: R, style: PathStyle, listing: L, persistence: P) -> Self {
        let root_path = root.as_ref().to_path_buf();
        let normalizer = PathNormalizer::new(style, &root_path);
        let root = normalizer.base().clone();
        Self {
            normalizer,
            root_path,
            root,
            locks: LockStore::new(),
            hidden: HiddenSet::new(),
            rules: RuleEngine::new(),
            rule_source: String::new(),
            listing,
            persistence,
            dirty: BTreeSet::new(),
        }
    }

    /// Loads both lock tiers from persistence.
    ///
    /// A tier that cannot be read is logged and treated as empty.
    pub fn load_locks(&mut self) -> LoadReport {
        let mut report = LoadReport::default();
        for kind in LockKind::ALL {
            let records = match self.persistence.load(kind) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("Starting with no {} locks: {}", kind, e);
                    Default::default()
                }
            };
            let loaded = self.locks.replace_tier(kind, &records, &self.normalizer);
            match kind {
                LockKind::Permanent => report.permanent = loaded,
                LockKind::Temporary => report.temporary = loaded,
            }
        }
        tracing::info!(
            "Loaded {} permanent and {} temporary locks",
            report.permanent,
            report.temporary
        );
        report
    }

    /// Canonical key for `path`.
    pub fn normalize<Q: AsRef<Path>>(&self, path: Q) -> PathKey {
        self.normalizer.normalize(path)
    }

    /// The root key.
    pub fn root(&self) -> &PathKey {
        &self.root
    }

    /// The root as configured.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Moves the session to a new root and re-applies the current rules
    /// against it. Lock and hidden state carry over.
    pub fn set_root<R: AsRef<Path>>(&mut self, root: R) -> Vec<EngineError> {
        self.root_path = root.as_ref().to_path_buf();
        self.normalizer = PathNormalizer::new(self.normalizer.style(), &self.root_path);
        self.root = self.normalizer.base().clone();
        tracing::info!("Root changed to {}", self.root);
        let source = std::mem::take(&mut self.rule_source);
        self.reload_rules(&source)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether the contents of `path` may be opened.
    pub fn is_accessible<Q: AsRef<Path>>(&self, path: Q) -> bool {
        self.access().is_accessible(&self.normalize(path))
    }

    /// The nearest lock that keeps `path` closed, if any.
    pub fn blocking_lock<Q: AsRef<Path>>(&self, path: Q) -> Option<PathKey> {
        self.access().blocking_node(&self.normalize(path))
    }

    /// Whether `path` should be listed. The entry kind comes from the listing
    /// provider; a path that does not exist is governed by the hidden set
    /// only.
    ///
    /// Paths are compared lexically. Absolute paths must be spelled under
    /// [`root_path`](Self::root_path); one reached through a symlinked prefix
    /// matches no rule folder and no hidden key. Relative paths are joined
    /// onto the root.
    pub fn is_visible<Q: AsRef<Path>>(&self, path: Q) -> bool {
        let path = self.resolve(path.as_ref());
        let kind = self.listing.entry_kind(&path);
        let key = self.normalize(&path);
        let name = listed_name(&path);
        self.visibility().is_visible(&key, &name, kind)
    }

    /// Whether an entry from a listing should be shown.
    pub fn is_entry_visible(&self, entry: &TreeEntry) -> bool {
        let key = entry.key(&self.normalizer);
        self.visibility()
            .is_visible(&key, &entry.name(), Some(entry.kind()))
    }

    /// Full status of one listed entry, memoizing access checks in `cache`.
    pub fn entry_status(&self, entry: &TreeEntry, cache: &mut AccessCache) -> EntryStatus {
        let key = entry.key(&self.normalizer);
        self.visibility()
            .status(&key, &entry.name(), Some(entry.kind()), cache)
    }

    /// Lock lifecycle state of `path` itself.
    pub fn lock_state<Q: AsRef<Path>>(&self, path: Q) -> LockState {
        self.locks.state(&self.normalize(path))
    }

    /// Kind of the entry at `path`, as reported by the listing provider.
    pub fn entry_kind<Q: AsRef<Path>>(&self, path: Q) -> Option<EntryKind> {
        self.listing.entry_kind(&self.resolve(path.as_ref()))
    }

    /// Immediate children of `dir` as reported by the listing provider.
    pub fn list_children<Q: AsRef<Path>>(&self, dir: Q) -> Result<Vec<TreeEntry>> {
        self.listing.list_children(&self.resolve(dir.as_ref()))
    }

    /// Visible children of `dir`, with their status.
    pub fn visible_children<Q: AsRef<Path>>(
        &self,
        dir: Q,
        cache: &mut AccessCache,
    ) -> Result<Vec<(TreeEntry, EntryStatus)>> {
        Ok(self
            .list_children(dir)?
            .into_iter()
            .map(|entry| {
                let status = self.entry_status(&entry, cache);
                (entry, status)
            })
            .filter(|(_, status)| status.visible)
            .collect())
    }

    /// Loaded rule statements.
    pub fn rules(&self) -> &[Rule] {
        self.rules.rules()
    }

    /// The hidden set.
    pub fn hidden(&self) -> &HiddenSet {
        &self.hidden
    }

    /// The lock store.
    pub fn locks(&self) -> &LockStore {
        &self.locks
    }

    /// The lock persistence collaborator.
    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// The listing collaborator.
    pub fn listing(&self) -> &L {
        &self.listing
    }

    /// Mutable access to the listing collaborator, for hosts that re-root it.
    pub fn listing_mut(&mut self) -> &mut L {
        &mut self.listing
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Sets a permanent lock on `path`, re-arming it if it was open.
    pub fn set_permanent_lock<Q: AsRef<Path>>(&mut self, path: Q, password: &str) {
        let key = self.normalize(path);
        tracing::info!("Setting permanent lock on {}", key);
        self.locks.set_permanent_lock(key, password);
        self.dirty.insert(LockKind::Permanent);
    }

    /// Sets a one-shot temporary lock on `path`.
    pub fn set_temporary_lock<Q: AsRef<Path>>(&mut self, path: Q, password: &str) {
        let key = self.normalize(path);
        tracing::info!("Setting temporary lock on {}", key);
        self.locks.set_temporary_lock(key, password);
        self.dirty.insert(LockKind::Temporary);
    }

    /// Tries to open the lock on `path`.
    pub fn attempt_unlock<Q: AsRef<Path>>(&mut self, path: Q, password: &str) -> UnlockResult {
        let key = self.normalize(path);
        let consumes_temporary = !self.locks.has_permanent(&key) && self.locks.has_temporary(&key);
        let result = self.locks.attempt_unlock(&key, password);
        match result {
            UnlockResult::Unlocked => {
                if consumes_temporary {
                    tracing::info!("Temporary lock on {} consumed", key);
                    self.dirty.insert(LockKind::Temporary);
                } else {
                    tracing::info!("Unlocked {}", key);
                }
            }
            UnlockResult::WrongPassword => tracing::info!("Wrong password for {}", key),
            UnlockResult::NotLocked => tracing::debug!("{} is not locked", key),
        }
        result
    }

    /// Closes an opened permanent lock. Returns whether anything changed.
    pub fn relock<Q: AsRef<Path>>(&mut self, path: Q) -> bool {
        let key = self.normalize(path);
        let changed = self.locks.relock(&key);
        if changed {
            tracing::info!("Relocked {}", key);
        }
        changed
    }

    /// Hides `path` from listings. Returns false if it was already hidden.
    pub fn hide<Q: AsRef<Path>>(&mut self, path: Q) -> bool {
        let key = self.normalize(path);
        tracing::info!("Hiding {}", key);
        self.hidden.hide(key)
    }

    /// Replaces the rule set with `source` and applies its `HIDE`
    /// statements to the root's immediate children.
    ///
    /// Returns one diagnostic per skipped line. A root that cannot be listed
    /// is reported as well; the conditional rules still load.
    pub fn reload_rules(&mut self, source: &str) -> Vec<EngineError> {
        let parsed = parse_rules(source);
        let mut diagnostics = parsed.diagnostics;
        for diagnostic in &diagnostics {
            tracing::warn!("Skipping rule: {}", diagnostic);
        }

        self.rules = RuleEngine::load(parsed.rules, &self.root);
        self.rule_source = source.to_string();

        let hide_names: Vec<String> = self.rules.hide_names().map(str::to_string).collect();
        if !hide_names.is_empty() {
            match self.listing.list_children(&self.root_path) {
                Ok(children) => {
                    for child in children {
                        let name = child.name();
                        if hide_names.iter().any(|hidden| *hidden == name) {
                            let key = child.key(&self.normalizer);
                            tracing::debug!("HIDE rule hides {}", key);
                            self.hidden.hide(key);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Cannot apply HIDE rules: {}", e);
                    diagnostics.push(e);
                }
            }
        }

        tracing::info!(
            "Loaded {} rules ({} conditional)",
            self.rules.rules().len(),
            self.rules.conditional_count()
        );
        diagnostics
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Whether some lock tier changed since it was last saved.
    pub fn has_unsaved_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Writes every changed lock tier.
    ///
    /// Tiers that fail stay pending and are retried on the next call. The
    /// first failure is returned after all tiers were attempted.
    pub fn save_pending(&mut self) -> Result<()> {
        let mut first_error = None;
        for kind in std::mem::take(&mut self.dirty) {
            let records = self.locks.records(kind);
            match self.persistence.save(kind, &records) {
                Ok(()) => tracing::debug!("Saved {} {} locks", records.len(), kind),
                Err(e) => {
                    let e = match e {
                        EngineError::PersistenceWrite { .. } => e,
                        other => EngineError::PersistenceWrite {
                            kind,
                            reason: other.to_string(),
                        },
                    };
                    tracing::warn!("{}", e);
                    self.dirty.insert(kind);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// `path` as given if absolute, otherwise joined onto the root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_path.join(path)
        }
    }

    fn access(&self) -> AccessEvaluator<'_> {
        AccessEvaluator::new(&self.locks, &self.root)
    }

    fn visibility(&self) -> VisibilityEvaluator<'_> {
        VisibilityEvaluator::new(&self.rules, &self.hidden, &self.locks, &self.root)
    }
}

fn listed_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
