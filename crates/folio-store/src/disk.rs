use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use folio_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// Loose-object store on the local filesystem.
///
/// Layout:
/// ```text
/// <root>/<first 2 hex chars>/<remaining 62 hex chars>
/// ```
/// Each file holds a one-byte [`ObjectKind`] tag followed by the object data.
/// New objects are written to a temporary file in the shard directory and
/// renamed into place, so readers never observe a partially written object
/// and concurrent writers of the same content are harmless.
#[derive(Debug, Clone)]
pub struct DiskObjectStore {
    root: PathBuf,
}

impl DiskObjectStore {
    /// Open (or create) an object directory at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory holding the object shards.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shard_dir(&self, id: &ObjectId) -> PathBuf {
        self.root.join(&id.to_hex()[..2])
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.shard_dir(id).join(&id.to_hex()[2..])
    }
}

impl ObjectStore for DiskObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let raw = match fs::read(self.object_path(id)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (tag, data) = raw.split_first().ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: "empty object file".into(),
        })?;
        let kind = ObjectKind::from_tag(*tag).ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: format!("unknown kind tag {tag:#04x}"),
        })?;
        let object = StoredObject::new(kind, data.to_vec());
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }
        let shard = self.shard_dir(&id);
        fs::create_dir_all(&shard)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&shard)?;
        tmp.write_all(&[object.kind.tag()])?;
        tmp.write_all(&object.data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        tracing::debug!(%id, kind = %object.kind, size = object.size, "wrote loose object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    /// File length minus the kind tag. The content is not re-hashed.
    fn size(&self, id: &ObjectId) -> StoreResult<Option<u64>> {
        match fs::metadata(self.object_path(id)) {
            Ok(meta) => Ok(Some(meta.len().saturating_sub(1))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{EntryMode, TreeEntry};

    fn store() -> (tempfile::TempDir, DiskObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskObjectStore::open(dir.path().join("objects")).unwrap();
        (dir, store)
    }

    #[test]
    fn size_excludes_kind_tag() {
        let (_dir, store) = store();
        let id = store.store_blob(b"twelve bytes").unwrap();
        assert_eq!(store.size(&id).unwrap(), Some(12));
        assert_eq!(store.size(&ObjectId::from_bytes(b"absent")).unwrap(), None);
    }

    #[test]
    fn blob_survives_reopen() {
        let (dir, store) = store();
        let id = store.store_blob(b"persisted").unwrap();
        drop(store);

        let reopened = DiskObjectStore::open(dir.path().join("objects")).unwrap();
        assert_eq!(reopened.read_blob(&id).unwrap(), b"persisted");
    }

    #[test]
    fn objects_are_sharded_by_prefix() {
        let (_dir, store) = store();
        let id = store.store_blob(b"sharded").unwrap();
        let hex = id.to_hex();
        let path = store.root().join(&hex[..2]).join(&hex[2..]);
        assert!(path.is_file());
    }

    #[test]
    fn rewrite_is_noop() {
        let (_dir, store) = store();
        let id1 = store.store_blob(b"same").unwrap();
        let id2 = store.store_blob(b"same").unwrap();
        assert_eq!(id1, id2);
        let shard = store.root().join(&id1.to_hex()[..2]);
        assert_eq!(fs::read_dir(shard).unwrap().count(), 1);
    }

    #[test]
    fn commit_chain_roundtrip() {
        let (_dir, store) = store();
        let blob = store.store_blob(b"Title\n=====\n").unwrap();
        let tree = store
            .store_tree(vec![TreeEntry::new(EntryMode::Regular, "index.rst", blob)])
            .unwrap();
        let root = store.store_commit(tree, vec![], "ada", "Create").unwrap();
        let next = store.store_commit(tree, vec![root], "ada", "Edit").unwrap();
        assert_eq!(store.read_commit(&next).unwrap().parent(), Some(&root));
    }

    #[test]
    fn missing_object_reads_none() {
        let (_dir, store) = store();
        let id = ObjectId::from_bytes(b"nope");
        assert!(store.read(&id).unwrap().is_none());
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn tampered_object_fails_hash_check() {
        let (_dir, store) = store();
        let id = store.store_blob(b"original").unwrap();
        let hex = id.to_hex();
        let path = store.root().join(&hex[..2]).join(&hex[2..]);
        fs::write(&path, b"btampered").unwrap();
        assert!(matches!(
            store.read(&id),
            Err(StoreError::HashMismatch { .. })
        ));
    }

    #[test]
    fn unknown_tag_is_corrupt() {
        let (_dir, store) = store();
        let id = store.store_blob(b"x").unwrap();
        let hex = id.to_hex();
        fs::write(store.root().join(&hex[..2]).join(&hex[2..]), b"?x").unwrap();
        assert!(matches!(
            store.read(&id),
            Err(StoreError::CorruptObject { .. })
        ));
    }
}
