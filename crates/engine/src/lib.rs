//! # Pathlock Engine Library
//!
//! This crate provides the access-control and conditional-visibility engine
//! behind the Pathlock file explorer.
//!
//! ## Overview
//!
//! The engine decides, for every node of a browsed directory subtree, two
//! independent things:
//!
//! - **Accessibility**: whether the node's contents may be opened, given the
//!   password locks on it and its ancestors
//! - **Visibility**: whether the node appears in a listing at all, given
//!   `HIDE` statements, explicit hide actions, and `IF ... IS UNLOCKED, SHOW`
//!   rules
//!
//! Locks come in two tiers. Permanent locks persist across sessions and can
//! be reopened and closed at will; the open state lasts for the session only.
//! Temporary locks persist until unlocked once, then vanish.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │  LockStore   │  │  HiddenSet   │  │   RuleEngine     │   │
//! │  └──────┬───────┘  └──────┬───────┘  └────────┬─────────┘   │
//! │         │                 │                   │             │
//! │  ┌──────┴───────┐  ┌──────┴───────────────────┴─────────┐   │
//! │  │   Access     │  │          Visibility                │   │
//! │  │  Evaluator   │  │          Evaluator                 │   │
//! │  └──────────────┘  └────────────────────────────────────┘   │
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │   ListingProvider             LockPersistence               │  host supplied
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use engine::{Engine, MemoryListing, MemoryPersistence, PathStyle, UnlockResult};
//!
//! let mut listing = MemoryListing::new();
//! listing.add_file("/vault/a.txt").add_file("/vault/b.txt");
//!
//! let mut engine = Engine::new("/vault", PathStyle::Posix, listing, MemoryPersistence::new());
//! engine.set_permanent_lock("a.txt", "pw1");
//! engine.reload_rules("IF a.txt IS UNLOCKED, SHOW b.txt.");
//!
//! assert!(!engine.is_visible("b.txt"));
//! assert_eq!(engine.attempt_unlock("a.txt", "pw1"), UnlockResult::Unlocked);
//! assert!(engine.is_visible("b.txt"));
//! ```
//!
//! ## Modules
//!
//! - [`path_key`]: Path normalization and canonical keys
//! - [`locks`]: Lock records, secrets, and the lock store
//! - [`hidden`]: Explicitly hidden paths
//! - [`rules`]: Rule parsing and conditional visibility
//! - [`access`]: Ancestor-chain access decisions
//! - [`visibility`]: Listing decisions
//! - [`provider`]: Host collaborator traits
//! - [`memory`]: In-memory collaborators
//! - [`engine`]: The session state object
//! - [`error`]: Error types

pub mod access;
pub mod engine;
pub mod entry;
pub mod error;
pub mod hidden;
pub mod locks;
pub mod memory;
pub mod path_key;
pub mod provider;
pub mod rules;
pub mod visibility;

pub use access::{AccessCache, AccessEvaluator};
pub use engine::{Engine, LoadReport};
pub use entry::{EntryKind, TreeEntry};
pub use error::{EngineError, Result};
pub use hidden::HiddenSet;
pub use locks::{
    LockEntry, LockKind, LockRecords, LockState, LockStore, SecretHash, UnlockResult,
};
pub use memory::{MemoryListing, MemoryPersistence};
pub use path_key::{PathKey, PathNormalizer, PathStyle};
pub use provider::{ListingProvider, LockPersistence};
pub use rules::{parse_rules, ConditionalRule, ParsedRules, Rule, RuleEngine};
pub use visibility::{EntryStatus, VisibilityEvaluator};
