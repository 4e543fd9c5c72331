//! Canonical path identities.
//!
//! Every map and set in the engine is keyed by [`PathKey`]. Keys are produced
//! lexically: relative paths are resolved against a base directory, `.` and
//! `..` components are collapsed, repeated separators are squashed, and on
//! Windows-style keys the whole path is case-folded and every separator is
//! rewritten to `\`. Symlinks are not followed, so normalization never touches
//! the filesystem.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How paths are spelled on the filesystem being browsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// `/`-separated, case-sensitive.
    Posix,
    /// `\` or `/`-separated, case-insensitive, optional drive or UNC prefix.
    Windows,
}

impl PathStyle {
    /// The style of the platform this binary was built for.
    pub fn native() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }

    /// The separator written into keys of this style.
    pub fn separator(self) -> char {
        match self {
            PathStyle::Posix => '/',
            PathStyle::Windows => '\\',
        }
    }

    fn is_separator(self, c: char) -> bool {
        match self {
            PathStyle::Posix => c == '/',
            PathStyle::Windows => c == '/' || c == '\\',
        }
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::native()
    }
}

/// Canonical identity of a filesystem location.
///
/// Two keys compare equal exactly when they name the same location under the
/// key's [`PathStyle`]. A key is always absolute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey {
    key: String,
    style: PathStyle,
    /// Byte length of the root portion (`/`, `c:\`, `\\server\share\`).
    root_len: usize,
}

/// A path split into its root prefix and its components.
struct Split<'a> {
    prefix: String,
    rooted: bool,
    parts: Vec<&'a str>,
}

fn split(style: PathStyle, raw: &str) -> Split<'_> {
    let is_sep = |c: char| style.is_separator(c);
    let non_empty = |s: &&str| !s.is_empty();

    if style == PathStyle::Windows {
        let mut chars = raw.chars();
        let first = chars.next();
        let second = chars.next();

        // UNC: \\server\share\rest
        if first.is_some_and(is_sep) && second.is_some_and(is_sep) {
            let mut parts = raw[2..].split(is_sep).filter(non_empty);
            let server = parts.next().unwrap_or_default();
            let share = parts.next().unwrap_or_default();
            let mut prefix = String::from("\\\\");
            prefix.push_str(server);
            if !share.is_empty() {
                prefix.push('\\');
                prefix.push_str(share);
            }
            return Split {
                prefix,
                rooted: true,
                parts: parts.collect(),
            };
        }

        // Drive: c:\rest or c:rest
        if first.is_some_and(|c| c.is_ascii_alphabetic()) && second == Some(':') {
            let rest = &raw[2..];
            return Split {
                prefix: raw[..2].to_string(),
                rooted: rest.starts_with(is_sep),
                parts: rest.split(is_sep).filter(non_empty).collect(),
            };
        }
    }

    Split {
        prefix: String::new(),
        rooted: raw.starts_with(is_sep),
        parts: raw.split(is_sep).filter(non_empty).collect(),
    }
}

impl PathKey {
    fn build(style: PathStyle, prefix: &str, parts: &[&str]) -> Self {
        let mut stack: Vec<&str> = Vec::with_capacity(parts.len());
        for part in parts {
            match *part {
                "." => {}
                ".." => {
                    stack.pop();
                }
                other => stack.push(other),
            }
        }

        let sep = style.separator();
        let capacity = prefix.len() + 1 + parts.iter().map(|p| p.len() + 1).sum::<usize>();
        let mut key = String::with_capacity(capacity);
        key.push_str(prefix);
        key.push(sep);
        let root_len = key.len();
        for (i, part) in stack.iter().enumerate() {
            if i > 0 {
                key.push(sep);
            }
            key.push_str(part);
        }

        Self {
            key,
            style,
            root_len,
        }
    }

    /// Builds a key from text that is already absolute. Relative text is
    /// treated as if it started at the root.
    fn from_absolute(style: PathStyle, raw: &str) -> Self {
        let folded = fold_case(style, raw);
        let parsed = split(style, &folded);
        Self::build(style, &parsed.prefix, &parsed.parts)
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The style this key was normalized with.
    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// Whether this key is a filesystem root.
    pub fn is_root(&self) -> bool {
        self.key.len() == self.root_len
    }

    /// The parent directory, or `None` at a filesystem root.
    pub fn parent(&self) -> Option<PathKey> {
        if self.is_root() {
            return None;
        }
        let tail = &self.key[self.root_len..];
        let end = match tail.rfind(self.style.separator()) {
            Some(idx) => self.root_len + idx,
            None => self.root_len,
        };
        Some(Self {
            key: self.key[..end].to_string(),
            style: self.style,
            root_len: self.root_len,
        })
    }

    /// The final component, or `None` at a filesystem root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        let tail = &self.key[self.root_len..];
        Some(match tail.rfind(self.style.separator()) {
            Some(idx) => &tail[idx + 1..],
            None => tail,
        })
    }

    /// Appends a relative path, normalizing the result.
    pub fn join(&self, relative: &str) -> PathKey {
        let mut raw = self.key.clone();
        if !self.is_root() {
            raw.push(self.style.separator());
        }
        raw.push_str(relative);
        Self::from_absolute(self.style, &raw)
    }

    /// Whether `self` is `ancestor` or lies beneath it.
    pub fn starts_with(&self, ancestor: &PathKey) -> bool {
        if self.style != ancestor.style || !self.key.starts_with(&ancestor.key) {
            return false;
        }
        ancestor.is_root()
            || self.key.len() == ancestor.key.len()
            || self.key[ancestor.key.len()..].starts_with(self.style.separator())
    }

    /// Iterates `self` followed by each ancestor up to the filesystem root.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: Some(self.clone()),
        }
    }

    /// `self` and its ancestors, stopping at `root` inclusive.
    ///
    /// A key outside `root` yields its full chain to the filesystem root.
    pub fn chain_to(&self, root: &PathKey) -> Vec<PathKey> {
        let bounded = self.starts_with(root);
        let mut chain = Vec::new();
        for key in self.ancestors() {
            let at_root = bounded && key == *root;
            chain.push(key);
            if at_root {
                break;
            }
        }
        chain
    }

    /// The key as a native path.
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.key)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl AsRef<str> for PathKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

/// Iterator over a key and its ancestors.
pub struct Ancestors {
    next: Option<PathKey>,
}

impl Iterator for Ancestors {
    type Item = PathKey;

    fn next(&mut self) -> Option<PathKey> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

fn fold_case(style: PathStyle, raw: &str) -> String {
    match style {
        PathStyle::Posix => raw.to_string(),
        PathStyle::Windows => raw.to_lowercase(),
    }
}

/// Turns arbitrary path spellings into [`PathKey`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNormalizer {
    style: PathStyle,
    base: PathKey,
}

impl PathNormalizer {
    /// Creates a normalizer that resolves relative paths against `base`.
    pub fn new<P: AsRef<Path>>(style: PathStyle, base: P) -> Self {
        let base = PathKey::from_absolute(style, &base.as_ref().to_string_lossy());
        Self { style, base }
    }

    /// Creates a normalizer for the native style, based at the current
    /// working directory.
    pub fn native() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        Self::new(PathStyle::native(), cwd)
    }

    /// The style keys are produced in.
    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// The directory relative paths resolve against.
    pub fn base(&self) -> &PathKey {
        &self.base
    }

    /// Normalizes a path into its canonical key.
    pub fn normalize<P: AsRef<Path>>(&self, path: P) -> PathKey {
        self.normalize_str(&path.as_ref().to_string_lossy())
    }

    /// Normalizes a textual path into its canonical key.
    pub fn normalize_str(&self, raw: &str) -> PathKey {
        let folded = fold_case(self.style, raw);
        let parsed = split(self.style, &folded);
        if parsed.rooted {
            return PathKey::build(self.style, &parsed.prefix, &parsed.parts);
        }

        let base = split(self.style, self.base.as_str());
        if !parsed.prefix.is_empty() && parsed.prefix != base.prefix {
            // Drive-relative path on another drive: anchor at that drive.
            return PathKey::build(self.style, &parsed.prefix, &parsed.parts);
        }
        let mut parts = base.parts;
        parts.extend(parsed.parts);
        PathKey::build(self.style, &base.prefix, &parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posix() -> PathNormalizer {
        PathNormalizer::new(PathStyle::Posix, "/home/user")
    }

    fn windows() -> PathNormalizer {
        PathNormalizer::new(PathStyle::Windows, "C:\\Users\\Me")
    }

    #[test]
    fn test_posix_collapses_separator_variants() {
        let n = posix();
        let expected = n.normalize("/data/docs/a.txt");
        assert_eq!(n.normalize("/data//docs/./a.txt"), expected);
        assert_eq!(n.normalize("/data/docs/sub/../a.txt"), expected);
        assert_eq!(n.normalize("/data/docs/a.txt/"), expected);
        assert_eq!(expected.as_str(), "/data/docs/a.txt");
    }

    #[test]
    fn test_posix_is_case_sensitive() {
        let n = posix();
        assert_ne!(n.normalize("/data/A.txt"), n.normalize("/data/a.txt"));
    }

    #[test]
    fn test_windows_collapses_case_and_separators() {
        let n = windows();
        let expected = n.normalize("C:\\Vault\\Docs\\A.TXT");
        assert_eq!(n.normalize("c:/vault/docs/a.txt"), expected);
        assert_eq!(n.normalize("C:\\VAULT\\\\docs\\.\\A.txt"), expected);
        assert_eq!(expected.as_str(), "c:\\vault\\docs\\a.txt");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for n in [posix(), windows()] {
            for raw in ["/a/b/../c", "rel/./x", "..", "/", "C:\\A\\b", "\\\\srv\\Share\\x"] {
                let once = n.normalize(raw);
                let twice = n.normalize(once.as_str());
                assert_eq!(once, twice, "not idempotent for {raw:?}");
            }
        }
    }

    #[test]
    fn test_relative_paths_resolve_against_base() {
        let n = posix();
        assert_eq!(n.normalize("notes.txt").as_str(), "/home/user/notes.txt");
        assert_eq!(n.normalize("../other").as_str(), "/home/other");
        assert_eq!(n.normalize(".").as_str(), "/home/user");

        let w = windows();
        assert_eq!(w.normalize("Docs\\x.txt").as_str(), "c:\\users\\me\\docs\\x.txt");
        assert_eq!(w.normalize("D:stuff").as_str(), "d:\\stuff");
    }

    #[test]
    fn test_parent_dir_never_escapes_root() {
        let n = posix();
        assert_eq!(n.normalize("/../../etc").as_str(), "/etc");
        let w = windows();
        assert_eq!(w.normalize("C:\\..\\x").as_str(), "c:\\x");
    }

    #[test]
    fn test_unc_prefix() {
        let w = windows();
        let key = w.normalize("//Server/Share/Dir/F.txt");
        assert_eq!(key.as_str(), "\\\\server\\share\\dir\\f.txt");
        let share = key.parent().unwrap().parent().unwrap();
        assert!(share.is_root());
        assert_eq!(share.as_str(), "\\\\server\\share\\");
    }

    #[test]
    fn test_parent_and_file_name() {
        let n = posix();
        let key = n.normalize("/data/docs/a.txt");
        assert_eq!(key.file_name(), Some("a.txt"));
        let parent = key.parent().unwrap();
        assert_eq!(parent.as_str(), "/data/docs");
        let top = parent.parent().unwrap();
        assert_eq!(top.as_str(), "/data");
        let root = top.parent().unwrap();
        assert_eq!(root.as_str(), "/");
        assert!(root.is_root());
        assert_eq!(root.file_name(), None);
        assert_eq!(root.parent(), None);
    }

    #[test]
    fn test_join() {
        let n = posix();
        let root = n.normalize("/data");
        assert_eq!(root.join("a.txt"), n.normalize("/data/a.txt"));
        assert_eq!(root.join("sub/../b"), n.normalize("/data/b"));
        assert_eq!(n.normalize("/").join("x"), n.normalize("/x"));

        let w = windows();
        assert_eq!(w.normalize("C:\\Data").join("Sub/A.TXT").as_str(), "c:\\data\\sub\\a.txt");
    }

    #[test]
    fn test_starts_with_is_component_wise() {
        let n = posix();
        let dir = n.normalize("/data/b");
        assert!(n.normalize("/data/b/c").starts_with(&dir));
        assert!(n.normalize("/data/b").starts_with(&dir));
        assert!(!n.normalize("/data/bc").starts_with(&dir));
        assert!(n.normalize("/data").starts_with(&n.normalize("/")));
    }

    #[test]
    fn test_chain_stops_at_root() {
        let n = posix();
        let root = n.normalize("/data");
        let chain = n.normalize("/data/a/b.txt").chain_to(&root);
        let chain: Vec<&str> = chain.iter().map(PathKey::as_str).collect();
        assert_eq!(chain, vec!["/data/a/b.txt", "/data/a", "/data"]);

        // Outside the root the whole chain is walked.
        let chain = n.normalize("/etc/x").chain_to(&root);
        assert_eq!(chain.len(), 3);
        assert!(chain.last().unwrap().is_root());
    }
}
