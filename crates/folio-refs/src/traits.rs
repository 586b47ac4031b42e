//! The [`RefStore`] trait defining the reference storage interface.

use folio_types::ObjectId;

use crate::error::Result;

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`). Names are full ref
/// names such as `refs/documents/42`; every operation validates the name
/// before touching storage.
pub trait RefStore: Send + Sync {
    /// Read the commit a ref points at.
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn get(&self, name: &str) -> Result<Option<ObjectId>>;

    /// Create `name` pointing at `commit` if and only if it does not exist.
    ///
    /// Returns `Ok(false)` without changing anything if the ref is already set.
    fn create_if_absent(&self, name: &str, commit: ObjectId) -> Result<bool>;

    /// Move `name` from `expected` to `new` if and only if it currently
    /// points at `expected`.
    ///
    /// Returns `Ok(false)` if the ref is absent or points elsewhere.
    fn set_if_equals(&self, name: &str, expected: ObjectId, new: ObjectId) -> Result<bool>;

    /// List all refs whose name starts with `prefix`, sorted by name.
    ///
    /// Pass `""` to list everything, `"refs/documents/"` for live documents.
    fn list(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>>;

    /// Create or compare-and-swap in one call.
    ///
    /// `expected == None` means the caller believes the ref is unset.
    fn update(&self, name: &str, expected: Option<ObjectId>, new: ObjectId) -> Result<bool> {
        match expected {
            None => self.create_if_absent(name, new),
            Some(expected) => self.set_if_equals(name, expected, new),
        }
    }
}
