//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The ref name is not a valid, namespaced name.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidRefName { name: String, reason: String },

    /// A ref file holds something other than an object id.
    #[error("corrupt ref {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// Another writer held the ref's lock through every retry.
    #[error("ref is locked: {name}")]
    Locked { name: String },

    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("ref store lock poisoned")]
    Poisoned,

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
