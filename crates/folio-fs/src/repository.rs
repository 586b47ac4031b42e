use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_refs::{DiskRefStore, InMemoryRefStore, RefStore};
use folio_store::{
    DiskObjectStore, EntryMode, InMemoryObjectStore, ObjectStore, TreeEntry,
};
use folio_types::ObjectId;
use walkdir::WalkDir;

use crate::error::{FsError, FsResult};
use crate::view::FsView;

/// Name of the marker file identifying an on-disk repository.
pub const MARKER_FILE: &str = "FOLIO";

const MARKER_CONTENTS: &str = "folio repository v1\n";

/// A repository: one object store plus one ref store.
///
/// Cloning is cheap and every clone shares the same backing stores.
#[derive(Clone)]
pub struct Repository {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    path: Option<PathBuf>,
}

impl Repository {
    /// A repository that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
        )
    }

    /// Assemble a repository from existing store handles.
    pub fn from_parts(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self {
            objects,
            refs,
            path: None,
        }
    }

    /// Create a new on-disk repository at `path`.
    ///
    /// Layout: `<path>/objects`, `<path>/refs` and a `<path>/FOLIO` marker.
    pub fn init(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        let marker = path.join(MARKER_FILE);
        if marker.exists() {
            return Err(FsError::AlreadyInitialized(path.to_path_buf()));
        }
        fs::create_dir_all(path)?;
        let repo = Self::open_stores(path)?;
        fs::write(&marker, MARKER_CONTENTS)?;
        tracing::info!(path = %path.display(), "initialized repository");
        Ok(repo)
    }

    /// Open an existing on-disk repository.
    pub fn open(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        if !path.join(MARKER_FILE).is_file() {
            return Err(FsError::NotARepository(path.to_path_buf()));
        }
        let repo = Self::open_stores(path)?;
        tracing::debug!(path = %path.display(), "opened repository");
        Ok(repo)
    }

    fn open_stores(path: &Path) -> FsResult<Self> {
        let objects = DiskObjectStore::open(path.join("objects"))?;
        // Ref names start with `refs/`, so the ref root is the repository root.
        let refs = DiskRefStore::open(path)?;
        Ok(Self {
            objects: Arc::new(objects),
            refs: Arc::new(refs),
            path: Some(path.to_path_buf()),
        })
    }

    /// The object store.
    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    /// The ref store.
    pub fn refs(&self) -> &Arc<dyn RefStore> {
        &self.refs
    }

    /// On-disk location, or `None` for an in-memory repository.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// A view of `branch` resolved to its current tip.
    pub fn view(&self, branch: &str) -> FsResult<FsView> {
        FsView::new(self.clone(), branch, None)
    }

    /// A view of `branch` pinned to `commit`, unaffected by later ref moves.
    pub fn view_at(&self, branch: &str, commit: ObjectId) -> FsResult<FsView> {
        FsView::new(self.clone(), branch, Some(commit))
    }

    /// Store a commit with at most one parent.
    pub fn commit(
        &self,
        tree: ObjectId,
        parent: Option<ObjectId>,
        author: &str,
        message: &str,
    ) -> FsResult<ObjectId> {
        let parents = parent.into_iter().collect();
        let id = self.objects.store_commit(tree, parents, author, message)?;
        tracing::debug!(%id, %tree, ?parent, "stored commit");
        Ok(id)
    }

    /// Recursively store the directory at `source` as a fresh tree.
    ///
    /// Files with an executable bit become [`EntryMode::Executable`], empty
    /// directories become empty trees, and symlinks are skipped.
    pub fn store_directory(&self, source: impl AsRef<Path>) -> FsResult<ObjectId> {
        let source = source.as_ref();
        let mut root = DirNode::default();

        for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| FsError::Walk {
                path: source.to_path_buf(),
                reason: e.to_string(),
            })?;
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                tracing::debug!(path = %entry.path().display(), "skipping symlink");
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| FsError::Walk {
                    path: entry.path().to_path_buf(),
                    reason: e.to_string(),
                })?;
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();

            if file_type.is_dir() {
                root.dir_mut(&segments);
            } else if file_type.is_file() {
                let data = fs::read(entry.path())?;
                let id = self.objects.store_blob(&data)?;
                let mode = if is_executable(entry.path())? {
                    EntryMode::Executable
                } else {
                    EntryMode::Regular
                };
                if let Some((name, parents)) = segments.split_last() {
                    root.dir_mut(parents)
                        .files
                        .insert(name.clone(), (mode, id));
                }
            }
        }

        let id = root.store(self.objects.as_ref())?;
        tracing::debug!(source = %source.display(), tree = %id, "stored directory");
        Ok(id)
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// In-memory directory used while importing a directory tree.
#[derive(Default)]
struct DirNode {
    dirs: BTreeMap<String, DirNode>,
    files: BTreeMap<String, (EntryMode, ObjectId)>,
}

impl DirNode {
    fn dir_mut(&mut self, segments: &[String]) -> &mut DirNode {
        segments
            .iter()
            .fold(self, |node, name| node.dirs.entry(name.clone()).or_default())
    }

    fn store(&self, objects: &dyn ObjectStore) -> FsResult<ObjectId> {
        let mut entries = Vec::with_capacity(self.dirs.len() + self.files.len());
        for (name, dir) in &self.dirs {
            entries.push(TreeEntry::new(EntryMode::Directory, name, dir.store(objects)?));
        }
        for (name, (mode, id)) in &self.files {
            entries.push(TreeEntry::new(*mode, name, *id));
        }
        Ok(objects.store_tree(entries)?)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> FsResult<bool> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> FsResult<bool> {
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skeleton() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.rst.hbs"), "Title\n=====\n").unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images/logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        dir
    }

    #[test]
    fn init_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path().join("repo")).unwrap();
        assert!(dir.path().join("repo/FOLIO").is_file());
        assert!(dir.path().join("repo/objects").is_dir());
        assert_eq!(repo.path(), Some(dir.path().join("repo").as_path()));

        let tree = repo.objects().store_tree(vec![]).unwrap();
        let commit = repo.commit(tree, None, "ada", "Create 1").unwrap();
        repo.refs().create_if_absent("refs/documents/1", commit).unwrap();
        drop(repo);

        let reopened = Repository::open(dir.path().join("repo")).unwrap();
        assert_eq!(reopened.refs().get("refs/documents/1").unwrap(), Some(commit));
    }

    #[test]
    fn init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        assert!(matches!(
            Repository::init(dir.path()),
            Err(FsError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn open_without_marker_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Repository::open(dir.path()),
            Err(FsError::NotARepository(_))
        ));
    }

    #[test]
    fn store_directory_mirrors_layout() {
        let source = skeleton();
        let repo = Repository::in_memory();
        let tree_id = repo.store_directory(source.path()).unwrap();

        let tree = repo.objects().read_tree(&tree_id).unwrap();
        let names: Vec<_> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["empty", "images", "index.rst.hbs"]);

        let empty = tree.get("empty").unwrap();
        assert!(empty.mode.is_directory());
        assert!(repo.objects().read_tree(&empty.object_id).unwrap().is_empty());

        let images = repo
            .objects()
            .read_tree(&tree.get("images").unwrap().object_id)
            .unwrap();
        let logo = images.get("logo.png").unwrap();
        assert_eq!(logo.mode, EntryMode::Regular);
        assert_eq!(
            repo.objects().read_blob(&logo.object_id).unwrap(),
            [0x89, b'P', b'N', b'G']
        );
    }

    #[test]
    fn store_directory_is_deterministic() {
        let source = skeleton();
        let repo = Repository::in_memory();
        let first = repo.store_directory(source.path()).unwrap();
        let second = repo.store_directory(source.path()).unwrap();
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn store_directory_keeps_executable_bit_and_skips_symlinks() {
        use std::os::unix::fs::{symlink, PermissionsExt};

        let source = tempfile::tempdir().unwrap();
        let script = source.path().join("build.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        symlink(&script, source.path().join("link.sh")).unwrap();

        let repo = Repository::in_memory();
        let tree = repo
            .objects()
            .read_tree(&repo.store_directory(source.path()).unwrap())
            .unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get("build.sh").unwrap().mode, EntryMode::Executable);
    }

    #[test]
    fn commit_rejects_missing_tree() {
        let repo = Repository::in_memory();
        let missing = ObjectId::from_bytes(b"nope");
        assert!(matches!(
            repo.commit(missing, None, "a", "m"),
            Err(FsError::Store(_))
        ));
    }
}
