//! Repository-relative path handling.
//!
//! Paths are `/`-separated and relative to a snapshot's root tree. Every
//! segment must be a plain name: empty, `.` and `..` segments are rejected so
//! a path can never address anything outside the tree it is resolved in.

use crate::error::{FsError, FsResult};

fn invalid(path: &str, reason: &str) -> FsError {
    FsError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Split a file path into its segments.
pub fn split_path(path: &str) -> FsResult<Vec<&str>> {
    if path.is_empty() {
        return Err(invalid(path, "path is empty"));
    }
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments {
        match *segment {
            "" => return Err(invalid(path, "empty path segment")),
            "." | ".." => return Err(invalid(path, "relative path segment")),
            s if s.contains('\0') => return Err(invalid(path, "NUL byte in path")),
            _ => {}
        }
    }
    Ok(segments)
}

/// Split a directory path into its segments. The empty string is the root.
pub fn split_dir(path: &str) -> FsResult<Vec<&str>> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    split_path(trimmed)
}
