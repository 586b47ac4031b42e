//! Ref name validation following git-style conventions.
//!
//! A valid name (or name suffix, such as a document id):
//! - Must be non-empty
//! - Must not contain whitespace, control characters, `~`, `^`, `:`, `?`,
//!   `*`, `[`, `\`
//! - Must not contain `..` (double dot) or `@{`
//! - Must not start or end with `.` or `/`
//! - No component may end with `.lock`
//! - Components between slashes must be non-empty and must not start with `.`
//!
//! Full ref names must additionally live under `refs/` with at least one
//! namespace component and a non-empty leaf.

use crate::error::{RefError, Result};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidRefName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a ref name suffix (for example a document id), returning
/// `Ok(())` if it can be appended to a namespace such as `refs/documents/`
/// without escaping it.
///
/// # Examples
///
/// ```
/// use folio_refs::names::validate_ref_component;
///
/// assert!(validate_ref_component("42").is_ok());
/// assert!(validate_ref_component("employee/42").is_ok());
/// assert!(validate_ref_component("/").is_err());
/// assert!(validate_ref_component("../heads/main").is_err());
/// ```
pub fn validate_ref_component(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
        }
    }
    if name.chars().any(char::is_control) {
        return Err(invalid(name, "contains a control character"));
    }

    // Parent traversal.
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }

    // Reflog syntax.
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid(name, "must not start or end with '.'"));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
        // Collides with the lock files of the disk backend.
        if component.ends_with(".lock") {
            return Err(invalid(
                name,
                format!("component must not end with '.lock': {component:?}"),
            ));
        }
    }

    Ok(())
}

/// Validate a full ref name such as `refs/documents/42`.
pub fn validate_ref_name(name: &str) -> Result<()> {
    let rest = name
        .strip_prefix("refs/")
        .ok_or_else(|| invalid(name, "must start with 'refs/'"))?;
    validate_ref_component(rest).map_err(|e| match e {
        RefError::InvalidRefName { reason, .. } => invalid(name, reason),
        other => other,
    })?;
    if !rest.contains('/') {
        return Err(invalid(name, "must have a namespace and a leaf name"));
    }
    Ok(())
}
