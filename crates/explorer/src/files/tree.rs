//! Recursive tree listings.
//!
//! A tree is built from the engine's view of the filesystem: only visible
//! entries appear, and directories whose contents are not accessible are
//! shown but not expanded.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use engine::{
    AccessCache, Engine, EntryKind, ListingProvider, LockPersistence, LockState, TreeEntry,
};

/// Why a directory node has no children listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeNote {
    /// A lock on the directory or an ancestor keeps it closed.
    Locked,
    /// The depth limit was reached.
    DepthLimit,
    /// The directory could not be read.
    Unreadable(String),
}

/// One node of a rendered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Listed name.
    pub name: String,
    /// Path as listed.
    pub path: PathBuf,
    /// Entry kind.
    pub kind: EntryKind,
    /// Lock state of the node itself.
    pub lock_state: LockState,
    /// Whether the node's contents may be opened.
    pub accessible: bool,
    /// Visible children, directories first.
    pub children: Vec<TreeNode>,
    /// Set on directories that were not expanded.
    pub note: Option<NodeNote>,
}

impl TreeNode {
    /// Total number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    /// Finds a direct child by name.
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Renders the tree with box-drawing connectors.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.label());
        self.render_children(&mut out, "");
        out
    }

    fn render_children(&self, out: &mut String, prefix: &str) {
        let last = self.children.len().saturating_sub(1);
        for (i, child) in self.children.iter().enumerate() {
            let (connector, extension) = if i == last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            let _ = writeln!(out, "{}{}{}", prefix, connector, child.label());
            child.render_children(out, &format!("{}{}", prefix, extension));
        }
    }

    /// Name with directory slash, lock decoration, and note.
    pub fn label(&self) -> String {
        let mut label = self.name.clone();
        if self.kind == EntryKind::Directory {
            label.push('/');
        }
        label.push_str(decoration(self.lock_state));
        match &self.note {
            Some(NodeNote::Locked) => label.push_str(" (locked)"),
            Some(NodeNote::DepthLimit) => label.push_str(" (...)"),
            Some(NodeNote::Unreadable(reason)) => {
                let _ = write!(label, " (unreadable: {})", reason);
            }
            None => {}
        }
        label
    }
}

/// Suffix marking a node's lock state.
pub fn decoration(state: LockState) -> &'static str {
    match state {
        LockState::LockedTemporary => " [🔒TEMP]",
        LockState::LockedPermanent => " [🔒]",
        LockState::UnlockedPermanent => " [🔑]",
        LockState::NoLock => "",
    }
}

/// Builds trees down to a fixed depth.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder {
    max_depth: usize,
}

impl TreeBuilder {
    /// Creates a builder that expands at most `max_depth` levels below the
    /// starting directory.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Builds the tree under `dir`. The starting node is always present.
    pub fn build<L, P>(&self, engine: &Engine<L, P>, dir: &Path) -> TreeNode
    where
        L: ListingProvider,
        P: LockPersistence,
    {
        let path = engine.resolve(dir);
        let kind = engine.entry_kind(&path).unwrap_or(EntryKind::Directory);
        let entry = TreeEntry::new(path.clone(), kind);
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => path.display().to_string(),
        };

        let mut cache = AccessCache::new();
        let status = engine.entry_status(&entry, &mut cache);
        let mut node = TreeNode {
            name,
            path,
            kind,
            lock_state: status.lock_state,
            accessible: status.accessible,
            children: Vec::new(),
            note: None,
        };
        if kind == EntryKind::Directory {
            self.expand(engine, &mut node, 0, &mut cache);
        }
        node
    }

    fn expand<L, P>(
        &self,
        engine: &Engine<L, P>,
        node: &mut TreeNode,
        depth: usize,
        cache: &mut AccessCache,
    ) where
        L: ListingProvider,
        P: LockPersistence,
    {
        if !node.accessible {
            node.note = Some(NodeNote::Locked);
            return;
        }
        if depth >= self.max_depth {
            node.note = Some(NodeNote::DepthLimit);
            return;
        }

        let children = match engine.visible_children(&node.path, cache) {
            Ok(children) => children,
            Err(e) => {
                tracing::debug!("Not expanding {:?}: {}", node.path, e);
                node.note = Some(NodeNote::Unreadable(e.to_string()));
                return;
            }
        };

        let mut nodes: Vec<TreeNode> = children
            .into_iter()
            .map(|(entry, status)| TreeNode {
                name: entry.name(),
                path: entry.path().to_path_buf(),
                kind: entry.kind(),
                lock_state: status.lock_state,
                accessible: status.accessible,
                children: Vec::new(),
                note: None,
            })
            .collect();
        nodes.sort_by(|a, b| {
            (b.kind == EntryKind::Directory)
                .cmp(&(a.kind == EntryKind::Directory))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        for child in nodes.iter_mut() {
            if child.kind == EntryKind::Directory {
                self.expand(engine, child, depth + 1, cache);
            }
        }
        node.children = nodes;
    }
}
