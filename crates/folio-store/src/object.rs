use chrono::{DateTime, Utc};
use folio_crypto::ContentHasher;
use folio_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw content (file contents).
    Blob,
    /// Directory listing: sorted entries mapping names to object references.
    Tree,
    /// Snapshot node: root tree plus parent links.
    Commit,
}

impl ObjectKind {
    /// One-byte tag used by on-disk backends.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Blob => b'b',
            Self::Tree => b't',
            Self::Commit => b'c',
        }
    }

    /// Parse an on-disk tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'b' => Some(Self::Blob),
            b't' => Some(Self::Tree),
            b'c' => Some(Self::Commit),
            _ => None,
        }
    }

    fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::Blob => &ContentHasher::BLOB,
            Self::Tree => &ContentHasher::TREE,
            Self::Commit => &ContentHasher::COMMIT,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// A stored object: kind tag + serialized data + cached size.
///
/// `StoredObject` is the unit of storage. Backends never interpret the data;
/// they are pure key-value stores keyed by content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The serialized bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }

    fn expect_kind(&self, kind: ObjectKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(StoreError::CorruptObject {
                id: self.compute_id(),
                reason: format!("expected {kind}, got {}", self.kind),
            });
        }
        Ok(())
    }

    fn decode_json<T: serde::de::DeserializeOwned>(&self, kind: ObjectKind) -> StoreResult<T> {
        self.expect_kind(kind)?;
        serde_json::from_slice(&self.data).map_err(|e| StoreError::CorruptObject {
            id: self.compute_id(),
            reason: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object (analogous to git blob).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from raw bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Blob)?;
        Ok(Self {
            data: obj.data.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Subtree / directory (0o040000).
    Directory,
}

impl EntryMode {
    /// Octal mode value (for display/serialization).
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Directory => 0o040000,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            0o040000 => Some(Self::Directory),
            _ => None,
        }
    }

    /// Returns `true` for subtree entries.
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File mode (regular, executable, directory).
    pub mode: EntryMode,
    /// Entry name (one path segment).
    pub name: String,
    /// Content-addressed ID of the referenced object.
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// Directory listing object (analogous to git tree).
///
/// Entries are kept sorted by name and unique, so two trees with the same
/// logical contents always serialize (and hash) identically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Sorted entries in this directory.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries.
    ///
    /// Entries are sorted by name; for duplicate names the last one wins.
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        let mut tree = Self::empty();
        for entry in entries {
            tree.insert(entry);
        }
        tree
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.decode_json(ObjectKind::Tree)
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Insert an entry, replacing any entry with the same name.
    pub fn insert(&mut self, entry: TreeEntry) {
        match self
            .entries
            .binary_search_by(|e| e.name.as_str().cmp(&entry.name))
        {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    /// Remove an entry by name, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.entries.remove(idx))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A snapshot of a document's full tree at one point in history.
///
/// Documents use zero parents (creation) or one parent (every later edit),
/// so their history is a linear chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Parent commits, oldest link first.
    pub parents: Vec<ObjectId>,
    /// Free-form author string, e.g. `"Jane <jane@example.org>"`.
    pub author: String,
    /// Commit message.
    pub message: String,
    /// When the commit was created.
    pub timestamp: DateTime<Utc>,
}

impl Commit {
    /// Create a commit stamped with the current time.
    pub fn new(
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parents,
            author: author.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// The first parent, if any. Documents never have more than one.
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    /// Returns `true` for a parentless (creation) commit.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Commit, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.decode_json(ObjectKind::Commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn blob_kind_mismatch() {
        let stored = StoredObject::new(ObjectKind::Tree, b"not a blob".to_vec());
        let err = Blob::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn tree_entries_sorted() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "zebra.txt", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "alpha.txt", ObjectId::null()),
            TreeEntry::new(EntryMode::Directory, "middle", ObjectId::null()),
        ]);
        let names: Vec<_> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha.txt", "middle", "zebra.txt"]);
    }

    #[test]
    fn tree_insert_replaces_same_name() {
        let mut tree = Tree::new(vec![TreeEntry::new(
            EntryMode::Regular,
            "index.rst",
            ObjectId::from_bytes(b"v1"),
        )]);
        tree.insert(TreeEntry::new(
            EntryMode::Regular,
            "index.rst",
            ObjectId::from_bytes(b"v2"),
        ));
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.get("index.rst").unwrap().object_id,
            ObjectId::from_bytes(b"v2")
        );
    }

    #[test]
    fn tree_insertion_order_does_not_change_id() {
        let a = TreeEntry::new(EntryMode::Regular, "a", ObjectId::from_bytes(b"a"));
        let b = TreeEntry::new(EntryMode::Directory, "b", ObjectId::from_bytes(b"b"));
        let t1 = Tree::new(vec![a.clone(), b.clone()]);
        let t2 = Tree::new(vec![b, a]);
        assert_eq!(
            t1.to_stored_object().unwrap().compute_id(),
            t2.to_stored_object().unwrap().compute_id()
        );
    }

    #[test]
    fn tree_remove() {
        let mut tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "a.txt", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "b.txt", ObjectId::null()),
        ]);
        assert!(tree.remove("a.txt").is_some());
        assert!(tree.remove("a.txt").is_none());
        assert!(tree.get("b.txt").is_some());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn tree_roundtrip() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "file.txt", ObjectId::from_bytes(b"content")),
            TreeEntry::new(EntryMode::Directory, "subdir", ObjectId::from_bytes(b"tree")),
        ]);
        let stored = tree.to_stored_object().unwrap();
        assert_eq!(Tree::from_stored_object(&stored).unwrap(), tree);
    }

    #[test]
    fn malformed_tree_is_corrupt() {
        let stored = StoredObject::new(ObjectKind::Tree, b"{not json".to_vec());
        assert!(matches!(
            Tree::from_stored_object(&stored),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn entry_mode_bits() {
        for mode in [EntryMode::Regular, EntryMode::Executable, EntryMode::Directory] {
            assert_eq!(EntryMode::from_mode_bits(mode.mode_bits()), Some(mode));
        }
        assert!(EntryMode::from_mode_bits(0o120000).is_none());
        assert_eq!(EntryMode::Regular.to_string(), "100644");
    }

    #[test]
    fn commit_roundtrip_keeps_timestamp() {
        let commit = Commit {
            tree: ObjectId::from_bytes(b"root"),
            parents: vec![ObjectId::from_bytes(b"parent")],
            author: "Ada <ada@example.org>".into(),
            message: "Edit 42".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };
        let stored = commit.to_stored_object().unwrap();
        let decoded = Commit::from_stored_object(&stored).unwrap();
        assert_eq!(decoded, commit);
        assert_eq!(decoded.parent(), Some(&ObjectId::from_bytes(b"parent")));
        assert!(!decoded.is_root());
    }

    #[test]
    fn different_kinds_produce_different_ids() {
        let data = b"same data".to_vec();
        let blob = StoredObject::new(ObjectKind::Blob, data.clone());
        let tree = StoredObject::new(ObjectKind::Tree, data.clone());
        let commit = StoredObject::new(ObjectKind::Commit, data);
        assert_ne!(blob.compute_id(), tree.compute_id());
        assert_ne!(blob.compute_id(), commit.compute_id());
    }

    #[test]
    fn kind_tags() {
        for kind in [ObjectKind::Blob, ObjectKind::Tree, ObjectKind::Commit] {
            assert_eq!(ObjectKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ObjectKind::from_tag(b'x'), None);
    }
}
