//! Collaborators the engine consumes from its host.
//!
//! The engine never reads the filesystem or durable storage itself. A host
//! supplies a [`ListingProvider`] for directory contents and a
//! [`LockPersistence`] for the two lock resources.

use std::path::Path;

use crate::entry::{EntryKind, TreeEntry};
use crate::error::Result;
use crate::locks::{LockKind, LockRecords};

/// Lists directory contents.
pub trait ListingProvider {
    /// Immediate children of `dir`.
    ///
    /// Failures are reported as [`crate::EngineError::PathResolution`] and
    /// only affect the subtree under `dir`.
    fn list_children(&self, dir: &Path) -> Result<Vec<TreeEntry>>;

    /// The kind of the entry at `path`, or `None` if nothing is there.
    fn entry_kind(&self, path: &Path) -> Option<EntryKind>;
}

/// Reads and writes the persisted lock tiers.
pub trait LockPersistence {
    /// Loads one tier. A missing resource should load as empty.
    fn load(&self, kind: LockKind) -> Result<LockRecords>;

    /// Replaces one tier durably.
    fn save(&self, kind: LockKind, records: &LockRecords) -> Result<()>;
}

impl<T: ListingProvider + ?Sized> ListingProvider for &T {
    fn list_children(&self, dir: &Path) -> Result<Vec<TreeEntry>> {
        (**self).list_children(dir)
    }

    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        (**self).entry_kind(path)
    }
}

impl<T: LockPersistence + ?Sized> LockPersistence for &T {
    fn load(&self, kind: LockKind) -> Result<LockRecords> {
        (**self).load(kind)
    }

    fn save(&self, kind: LockKind, records: &LockRecords) -> Result<()> {
        (**self).save(kind, records)
    }
}
