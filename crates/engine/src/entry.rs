//! Typed tree entries.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::path_key::{PathKey, PathNormalizer};

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

impl EntryKind {
    /// Guesses the kind from a bare name: anything containing a `.` is a
    /// file, everything else a folder.
    ///
    /// This is a naming heuristic, not a type check. A folder named `v1.2`
    /// is classified as a file.
    pub fn infer_from_name(name: &str) -> Self {
        if name.contains('.') {
            EntryKind::File
        } else {
            EntryKind::Directory
        }
    }
}

/// One entry returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TreeEntry {
    /// A file at the given path.
    File(PathBuf),
    /// A directory at the given path.
    Directory(PathBuf),
}

impl TreeEntry {
    /// Creates an entry of the given kind.
    pub fn new(path: PathBuf, kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => TreeEntry::File(path),
            EntryKind::Directory => TreeEntry::Directory(path),
        }
    }

    /// The entry's path as listed.
    pub fn path(&self) -> &Path {
        match self {
            TreeEntry::File(path) | TreeEntry::Directory(path) => path,
        }
    }

    /// The entry's kind.
    pub fn kind(&self) -> EntryKind {
        match self {
            TreeEntry::File(_) => EntryKind::File,
            TreeEntry::Directory(_) => EntryKind::Directory,
        }
    }

    /// Whether this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, TreeEntry::Directory(_))
    }

    /// The final path component as listed (not case-folded).
    pub fn name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The canonical key of this entry.
    pub fn key(&self, normalizer: &PathNormalizer) -> PathKey {
        normalizer.normalize(self.path())
    }
}
