//! Error types for the engine crate.

use thiserror::Error;

use crate::locks::LockKind;

/// Engine error type covering every failure the engine can report.
///
/// Wrong passwords and unlock attempts on unlocked paths are not errors; they
/// are reported through [`crate::UnlockResult`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    // Rule source errors
    /// A line of the rule source could not be parsed. The line is skipped.
    #[error("invalid rule syntax on line {line}: {reason}")]
    InvalidRuleSyntax {
        /// 1-based line number in the rule source.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    // Persistence errors
    /// A lock resource could not be read. Callers treat this as an empty store.
    #[error("failed to read {kind} lock data: {reason}")]
    PersistenceRead {
        /// Which lock resource failed.
        kind: LockKind,
        /// Underlying cause.
        reason: String,
    },

    /// A lock resource could not be written. In-memory state is still valid.
    #[error("failed to save {kind} lock data: {reason}")]
    PersistenceWrite {
        /// Which lock resource failed.
        kind: LockKind,
        /// Underlying cause.
        reason: String,
    },

    // Path errors
    /// A directory could not be enumerated.
    #[error("cannot resolve {path}: {reason}")]
    PathResolution {
        /// The path that failed.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// A persisted digest was not 64 hex characters.
    #[error("invalid secret digest: {0}")]
    InvalidDigest(String),
}

impl EngineError {
    /// Returns true for errors the engine recovers from by itself.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidRuleSyntax { .. }
                | EngineError::PersistenceRead { .. }
                | EngineError::PathResolution { .. }
                | EngineError::InvalidDigest(_)
        )
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
