//! JSON lock files.
//!
//! Each tier is a flat object mapping a path key to the hex SHA-256 digest of
//! its password:
//!
//! ```json
//! {
//!   "/home/me/share/private": "5e884898da28047151d0e56f8dc62927..."
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine::{EngineError, LockKind, LockPersistence, LockRecords};

/// File holding permanent locks.
pub const PERMANENT_LOCKS_FILE: &str = "passwords.json";

/// File holding temporary locks.
pub const TEMPORARY_LOCKS_FILE: &str = "temp_passwords.json";

/// Lock tiers stored as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct LockFileStore {
    dir: PathBuf,
}

impl LockFileStore {
    /// Creates a store that keeps its files in `dir`.
    ///
    /// Nothing is read or created until the first load or save.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The directory holding the lock files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for one tier.
    pub fn path(&self, kind: LockKind) -> PathBuf {
        match kind {
            LockKind::Permanent => self.dir.join(PERMANENT_LOCKS_FILE),
            LockKind::Temporary => self.dir.join(TEMPORARY_LOCKS_FILE),
        }
    }

    /// Reads one tier. A missing file reads as empty.
    pub fn read_records(&self, kind: LockKind) -> Result<LockRecords> {
        let path = self.path(kind);
        if !path.exists() {
            tracing::debug!("Lock file not found at {:?}, starting empty", path);
            return Ok(LockRecords::new());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read lock file: {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(LockRecords::new());
        }

        let records: LockRecords = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse lock file: {}", path.display()))?;

        tracing::debug!("Read {} {} locks from {:?}", records.len(), kind, path);
        Ok(records)
    }

    /// Replaces one tier.
    ///
    /// Uses atomic write (write to temp file, then rename) so a crash never
    /// leaves a truncated file. Creates the directory if it doesn't exist.
    pub fn write_records(&self, kind: LockKind, records: &LockRecords) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create lock directory: {}", self.dir.display())
        })?;

        let path = self.path(kind);
        let contents =
            serde_json::to_string_pretty(records).context("Failed to serialize lock records")?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &contents)
            .with_context(|| format!("Failed to write temp lock file: {}", temp_path.display()))?;

        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename temp lock file {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        tracing::debug!("Saved {} {} locks to {:?}", records.len(), kind, path);
        Ok(())
    }
}

impl LockPersistence for LockFileStore {
    fn load(&self, kind: LockKind) -> engine::Result<LockRecords> {
        self.read_records(kind)
            .map_err(|e| EngineError::PersistenceRead {
                kind,
                reason: format!("{:#}", e),
            })
    }

    fn save(&self, kind: LockKind, records: &LockRecords) -> engine::Result<()> {
        self.write_records(kind, records)
            .map_err(|e| EngineError::PersistenceWrite {
                kind,
                reason: format!("{:#}", e),
            })
    }
}
