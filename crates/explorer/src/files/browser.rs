//! Directory browsing within the explorer root.
//!
//! Every path is canonicalized and checked against the root before it is
//! read, so `..` components and symlinks cannot escape the browsed subtree.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use engine::{EngineError, EntryKind, ListingProvider, TreeEntry};
use thiserror::Error;

/// Errors that can occur during directory browsing.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The requested path is outside the root.
    #[error("path is outside the explorer root: {0}")]
    PathOutsideBoundary(PathBuf),

    /// The requested path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// The requested path is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    fn from_io(path: &Path, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => BrowserError::PathNotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                BrowserError::PermissionDenied(path.to_path_buf())
            }
            _ => BrowserError::Io(e),
        }
    }
}

/// A directory entry with metadata.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Full path under the canonical root.
    pub path: PathBuf,
    /// Entry kind. Anything that is not a directory is a file.
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modified timestamp.
    pub modified: SystemTime,
    /// Whether this is a symbolic link.
    pub is_symlink: bool,
}

impl DirectoryEntry {
    fn from_metadata(
        name: String,
        path: PathBuf,
        metadata: &fs::Metadata,
        is_symlink: bool,
    ) -> Self {
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Self {
            name,
            path,
            kind,
            size: if metadata.is_file() { metadata.len() } else { 0 },
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_symlink,
        }
    }

    /// Convert to an engine listing entry.
    pub fn to_tree_entry(&self) -> TreeEntry {
        TreeEntry::new(self.path.clone(), self.kind)
    }
}

/// Directory browser confined to one root.
#[derive(Debug, Clone)]
pub struct DirectoryBrowser {
    /// Canonical root directory.
    root: PathBuf,
    /// Whether dot-entries are listed.
    show_dotfiles: bool,
}

impl DirectoryBrowser {
    /// Create a browser rooted at `root`.
    ///
    /// The root must be an existing directory; it is canonicalized once here.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, BrowserError> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root).map_err(|e| BrowserError::from_io(root, e))?;
        if !canonical.is_dir() {
            return Err(BrowserError::NotADirectory(canonical));
        }
        Ok(Self {
            root: canonical,
            show_dotfiles: false,
        })
    }

    /// Set whether entries starting with '.' are listed.
    pub fn show_dotfiles(mut self, show: bool) -> Self {
        self.show_dotfiles = show;
        self
    }

    /// The canonical root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate that a path is within the root.
    ///
    /// Relative paths resolve against the root. Returns the canonical path.
    pub fn validate_path(&self, path: &Path) -> Result<PathBuf, BrowserError> {
        let canonical =
            fs::canonicalize(self.resolve(path)).map_err(|e| BrowserError::from_io(path, e))?;
        if canonical.starts_with(&self.root) {
            Ok(canonical)
        } else {
            Err(BrowserError::PathOutsideBoundary(path.to_path_buf()))
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// List contents of a directory.
    ///
    /// Directories come first, then files, each group sorted by name without
    /// regard to case. Entries that cannot be read are skipped.
    pub fn list_directory(&self, path: &Path) -> Result<Vec<DirectoryEntry>, BrowserError> {
        let canonical = self.validate_path(path)?;

        let metadata = fs::metadata(&canonical).map_err(|e| BrowserError::from_io(path, e))?;
        if !metadata.is_dir() {
            return Err(BrowserError::NotADirectory(canonical));
        }

        let entries = fs::read_dir(&canonical).map_err(|e| BrowserError::from_io(path, e))?;

        let mut results = Vec::new();
        for entry_result in entries {
            let entry = match entry_result {
                Ok(e) => e,
                Err(_) => continue,
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if !self.show_dotfiles && name.starts_with('.') {
                continue;
            }

            let is_symlink = entry
                .file_type()
                .map(|t| t.is_symlink())
                .unwrap_or(false);

            // Follow symlinks for the kind; dangling links are skipped.
            let metadata = match fs::metadata(entry.path()) {
                Ok(m) => m,
                Err(_) => continue,
            };

            results.push(DirectoryEntry::from_metadata(
                name,
                entry.path(),
                &metadata,
                is_symlink,
            ));
        }

        sort_entries(&mut results);
        Ok(results)
    }

    /// Get metadata for a single path.
    pub fn get_entry(&self, path: &Path) -> Result<DirectoryEntry, BrowserError> {
        let canonical = self.validate_path(path)?;
        let metadata = fs::metadata(&canonical).map_err(|e| BrowserError::from_io(path, e))?;
        let is_symlink = fs::symlink_metadata(self.resolve(path))
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

        let name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(DirectoryEntry::from_metadata(name, canonical, &metadata, is_symlink))
    }
}

/// Directories first, then case-insensitive name order.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| {
        let a_is_dir = a.kind == EntryKind::Directory;
        let b_is_dir = b.kind == EntryKind::Directory;
        match (a_is_dir, b_is_dir) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    });
}

impl ListingProvider for DirectoryBrowser {
    fn list_children(&self, dir: &Path) -> engine::Result<Vec<TreeEntry>> {
        self.list_directory(dir)
            .map(|entries| entries.iter().map(DirectoryEntry::to_tree_entry).collect())
            .map_err(|e| EngineError::PathResolution {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })
    }

    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        self.get_entry(path).ok().map(|entry| entry.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_structure(dir: &Path) {
        fs::create_dir_all(dir.join("subdir")).unwrap();
        fs::create_dir_all(dir.join(".hidden_dir")).unwrap();

        fs::write(dir.join("file.txt"), "Hello").unwrap();
        fs::write(dir.join("subdir/nested.txt"), "Nested").unwrap();
        fs::write(dir.join(".hidden"), "Hidden").unwrap();
    }

    #[test]
    fn test_list_directory() {
        let temp = TempDir::new().unwrap();
        create_test_structure(temp.path());
        let browser = DirectoryBrowser::new(temp.path()).unwrap();

        let entries = browser.list_directory(temp.path()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["subdir", "file.txt"]);

        let file = entries.iter().find(|e| e.name == "file.txt").unwrap();
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.size, 5);
    }

    #[test]
    fn test_list_directory_with_dotfiles() {
        let temp = TempDir::new().unwrap();
        create_test_structure(temp.path());
        let browser = DirectoryBrowser::new(temp.path()).unwrap().show_dotfiles(true);

        let entries = browser.list_directory(temp.path()).unwrap();
        assert!(entries.iter().any(|e| e.name == ".hidden"));
        assert!(entries.iter().any(|e| e.name == ".hidden_dir"));
    }

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let temp = TempDir::new().unwrap();
        create_test_structure(temp.path());
        let browser = DirectoryBrowser::new(temp.path()).unwrap();

        let entries = browser.list_directory(Path::new("subdir")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "nested.txt");
    }

    #[test]
    fn test_path_outside_root() {
        let temp = TempDir::new().unwrap();
        create_test_structure(temp.path());
        let browser = DirectoryBrowser::new(temp.path().join("subdir")).unwrap();

        let result = browser.validate_path(&temp.path().join("file.txt"));
        assert!(matches!(result, Err(BrowserError::PathOutsideBoundary(_))));

        let result = browser.validate_path(Path::new("../file.txt"));
        assert!(matches!(result, Err(BrowserError::PathOutsideBoundary(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_outside_root() {
        let outside = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("escape")).unwrap();
        let browser = DirectoryBrowser::new(temp.path()).unwrap();

        let result = browser.list_directory(Path::new("escape"));
        assert!(matches!(result, Err(BrowserError::PathOutsideBoundary(_))));
    }

    #[test]
    fn test_path_not_found() {
        let temp = TempDir::new().unwrap();
        let browser = DirectoryBrowser::new(temp.path()).unwrap();
        let result = browser.list_directory(Path::new("missing"));
        assert!(matches!(result, Err(BrowserError::PathNotFound(_))));
    }

    #[test]
    fn test_not_a_directory() {
        let temp = TempDir::new().unwrap();
        create_test_structure(temp.path());
        let browser = DirectoryBrowser::new(temp.path()).unwrap();

        let result = browser.list_directory(Path::new("file.txt"));
        assert!(matches!(result, Err(BrowserError::NotADirectory(_))));
        assert!(DirectoryBrowser::new(temp.path().join("file.txt")).is_err());
    }

    #[test]
    fn test_get_entry() {
        let temp = TempDir::new().unwrap();
        create_test_structure(temp.path());
        let browser = DirectoryBrowser::new(temp.path()).unwrap();

        let entry = browser.get_entry(Path::new("subdir/nested.txt")).unwrap();
        assert_eq!(entry.name, "nested.txt");
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.size, 6);
        assert!(!entry.is_symlink);
    }

    #[test]
    fn test_directory_sorting() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.txt"), "").unwrap();
        fs::write(temp.path().join("A.txt"), "").unwrap();
        fs::create_dir(temp.path().join("zeta")).unwrap();
        fs::create_dir(temp.path().join("Alpha")).unwrap();
        let browser = DirectoryBrowser::new(temp.path()).unwrap();

        let names: Vec<String> = browser
            .list_directory(temp.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "zeta", "A.txt", "b.txt"]);
    }

    #[test]
    fn test_listing_provider() {
        let temp = TempDir::new().unwrap();
        create_test_structure(temp.path());
        let browser = DirectoryBrowser::new(temp.path()).unwrap();
        let root = browser.root().to_path_buf();

        let children = browser.list_children(&root).unwrap();
        assert_eq!(children.len(), 2);
        assert!(children[0].is_dir());
        assert_eq!(browser.entry_kind(&root.join("subdir")), Some(EntryKind::Directory));
        assert_eq!(browser.entry_kind(&root.join("nope")), None);

        let err = browser.list_children(&root.join("nope")).unwrap_err();
        assert!(matches!(err, EngineError::PathResolution { .. }));
    }
}
