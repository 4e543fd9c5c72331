//! In-memory collaborators.
//!
//! Useful for embedding the engine without a filesystem and for tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::entry::{EntryKind, TreeEntry};
use crate::error::{EngineError, Result};
use crate::locks::{LockKind, LockRecords};
use crate::provider::{ListingProvider, LockPersistence};

/// A fixed directory tree.
#[derive(Debug, Default, Clone)]
pub struct MemoryListing {
    entries: BTreeMap<PathBuf, EntryKind>,
}

impl MemoryListing {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file and any missing parent directories.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> &mut Self {
        self.add(path.as_ref(), EntryKind::File)
    }

    /// Adds a directory and any missing parent directories.
    pub fn add_dir<P: AsRef<Path>>(&mut self, path: P) -> &mut Self {
        self.add(path.as_ref(), EntryKind::Directory)
    }

    fn add(&mut self, path: &Path, kind: EntryKind) -> &mut Self {
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() || dir.parent().is_none() {
                break;
            }
            self.entries
                .entry(dir.to_path_buf())
                .or_insert(EntryKind::Directory);
            parent = dir.parent();
        }
        self.entries.insert(path.to_path_buf(), kind);
        self
    }
}

impl ListingProvider for MemoryListing {
    fn list_children(&self, dir: &Path) -> Result<Vec<TreeEntry>> {
        if self.entries.get(dir) == Some(&EntryKind::File) {
            return Err(EngineError::PathResolution {
                path: dir.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(self
            .entries
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, kind)| TreeEntry::new(path.clone(), *kind))
            .collect())
    }

    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        self.entries.get(path).copied()
    }
}

/// Lock tiers held in memory, with switchable failure injection.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    tiers: RefCell<BTreeMap<LockKind, LockRecords>>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    saves: Cell<usize>,
}

impl MemoryPersistence {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one tier.
    pub fn with_records(self, kind: LockKind, records: LockRecords) -> Self {
        self.tiers.borrow_mut().insert(kind, records);
        self
    }

    /// Makes every subsequent load fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    /// Makes every subsequent save fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// The stored records of one tier.
    pub fn records(&self, kind: LockKind) -> LockRecords {
        self.tiers.borrow().get(&kind).cloned().unwrap_or_default()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl LockPersistence for MemoryPersistence {
    fn load(&self, kind: LockKind) -> Result<LockRecords> {
        if self.fail_reads.get() {
            return Err(EngineError::PersistenceRead {
                kind,
                reason: "injected read failure".to_string(),
            });
        }
        Ok(self.records(kind))
    }

    fn save(&self, kind: LockKind, records: &LockRecords) -> Result<()> {
        if self.fail_writes.get() {
            return Err(EngineError::PersistenceWrite {
                kind,
                reason: "injected write failure".to_string(),
            });
        }
        self.tiers.borrow_mut().insert(kind, records.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
