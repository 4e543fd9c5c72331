//! File browsing module.
//!
//! This module provides filesystem access for the explorer:
//! - Directory listing confined to the explorer root
//! - Recursive tree building and rendering over the engine's view
//!
//! # Security
//!
//! All paths are canonicalized and validated against the root. Symlinks that
//! point outside the root are rejected.

pub mod browser;
pub mod tree;

pub use browser::{BrowserError, DirectoryBrowser, DirectoryEntry};
pub use tree::{decoration, NodeNote, TreeBuilder, TreeNode};
