use folio_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, ObjectKind, StoredObject, Tree, TreeEntry};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. Content-addressing guarantees this:
///   the same data always produces the same ID.
/// - Writing an object that is already present is a no-op success.
/// - Concurrent reads are always safe (objects are immutable).
/// - The store never interprets object contents; it is a pure key-value store.
/// - All I/O errors are propagated, never silently ignored.
///
/// The typed `store_*` / `read_*` methods are built on top of the three raw
/// primitives and need not be overridden.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    ///
    /// If the object already exists, this is a no-op (idempotent).
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Payload size of an object in bytes, without loading it where the
    /// backend allows. `Ok(None)` if the object does not exist.
    fn size(&self, id: &ObjectId) -> StoreResult<Option<u64>> {
        Ok(self.read(id)?.map(|obj| obj.size))
    }

    /// Read an object, failing with [`StoreError::NotFound`] when absent.
    fn read_required(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    /// Store raw bytes as a blob.
    fn store_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.write(&Blob::new(data.to_vec()).to_stored_object())
    }

    /// Store a directory level. Entries are sorted before hashing.
    fn store_tree(&self, entries: Vec<TreeEntry>) -> StoreResult<ObjectId> {
        self.write(&Tree::new(entries).to_stored_object()?)
    }

    /// Create and store a commit stamped with the current time.
    fn store_commit(
        &self,
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: &str,
        message: &str,
    ) -> StoreResult<ObjectId> {
        self.write_commit(&Commit::new(tree, parents, author, message))
    }

    /// Store a fully formed commit.
    ///
    /// The tree and every parent must already be present, so a stored commit
    /// never points at objects that a reader could fail to find.
    fn write_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        if !self.exists(&commit.tree)? {
            return Err(StoreError::MissingDependency {
                kind: ObjectKind::Tree,
                id: commit.tree,
            });
        }
        for parent in &commit.parents {
            if !self.exists(parent)? {
                return Err(StoreError::MissingDependency {
                    kind: ObjectKind::Commit,
                    id: *parent,
                });
            }
        }
        self.write(&commit.to_stored_object()?)
    }

    /// Read a blob's bytes.
    fn read_blob(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        Ok(Blob::from_stored_object(&self.read_required(id)?)?.data)
    }

    /// Read a tree's entries.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        Tree::from_stored_object(&self.read_required(id)?)
    }

    /// Read a commit.
    fn read_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        Commit::from_stored_object(&self.read_required(id)?)
    }
}
