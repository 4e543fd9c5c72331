//! # Pathlock Explorer Library
//!
//! This crate wires the Pathlock engine to the filesystem and provides the
//! `pathlock` command-line explorer.
//!
//! ## Overview
//!
//! - **Configuration**: TOML settings for the root, data directory, and rule file
//! - **Lock Storage**: Permanent and one-time locks persisted as JSON files
//! - **File Browsing**: Root-confined directory listing and tree rendering
//! - **Sessions**: Interactive command execution with save-after-change
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   pathlock (CLI / shell)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                         Session                             │
//! │   ┌───────────────┐  ┌─────────────────────────────────┐    │
//! │   │  TreeBuilder  │  │          engine::Engine         │    │
//! │   └───────────────┘  └───────┬─────────────────┬───────┘    │
//! │                              │                 │            │
//! │                 ┌────────────┴─────┐  ┌────────┴─────────┐  │
//! │                 │ DirectoryBrowser │  │  LockFileStore   │  │
//! │                 └──────────────────┘  └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`storage`]: Lock file persistence
//! - [`files`]: Directory browsing and tree rendering
//! - [`session`]: Command parsing and execution

pub mod config;
pub mod files;
pub mod session;
pub mod storage;

// Re-export the engine for convenience
pub use engine;

// Re-export config types for convenience
pub use config::{default_config_path, Config, ConfigError};

// Re-export files types for convenience
pub use files::{BrowserError, DirectoryBrowser, DirectoryEntry, TreeBuilder, TreeNode};

// Re-export session types for convenience
pub use session::{available_actions, Action, Command, CommandError, Outcome, Session};

// Re-export storage types for convenience
pub use storage::LockFileStore;
