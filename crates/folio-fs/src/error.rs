use std::path::PathBuf;

use folio_refs::RefError;
use folio_store::StoreError;

/// Errors from repository and snapshot-view operations.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// A path that cannot address an entry inside a tree.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// No entry exists at the path in the resolved snapshot.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The path names a directory where a file was expected.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// A path segment names a file where a directory was expected.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// `open` on a directory without a repository marker.
    #[error("not a folio repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// `init` on a directory that already holds a repository.
    #[error("repository already exists at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    /// Failure while walking a directory on disk.
    #[error("failed to walk {}: {reason}", path.display())]
    Walk { path: PathBuf, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for filesystem-view operations.
pub type FsResult<T> = Result<T, FsError>;
