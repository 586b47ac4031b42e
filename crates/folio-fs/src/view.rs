use std::sync::Arc;

use folio_store::{Commit, EntryMode, ObjectStore, StoreError, Tree, TreeEntry};
use folio_types::ObjectId;

use crate::error::{FsError, FsResult};
use crate::path::{split_dir, split_path};
use crate::repository::Repository;

/// A read/write view of one branch, resolved to a single commit.
///
/// The commit is fixed when the view is built: either the commit pinned by
/// the caller, or the branch tip at that moment. Reads always resolve
/// against that snapshot, so later ref movement never changes what a view
/// returns. Staging writes new objects but never touches the ref.
#[derive(Clone, Debug)]
pub struct FsView {
    repo: Repository,
    branch: String,
    commit: Option<ObjectId>,
    tree: Option<ObjectId>,
}

impl FsView {
    pub(crate) fn new(repo: Repository, branch: &str, pinned: Option<ObjectId>) -> FsResult<Self> {
        let commit = match pinned {
            Some(commit) => Some(commit),
            None => repo.refs().get(branch)?,
        };
        let tree = match commit {
            Some(id) => Some(repo.objects().read_commit(&id)?.tree),
            None => None,
        };
        tracing::debug!(branch, ?commit, pinned = pinned.is_some(), "resolved view");
        Ok(Self {
            repo,
            branch: branch.to_string(),
            commit,
            tree,
        })
    }

    /// The repository this view reads from.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// The branch (full ref name) this view was built for.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// The resolved commit, or `None` if the branch does not exist yet.
    pub fn commit_id(&self) -> Option<ObjectId> {
        self.commit
    }

    /// The root tree of the resolved commit.
    pub fn tree_id(&self) -> Option<ObjectId> {
        self.tree
    }

    /// The resolved commit object (author, message, timestamp).
    pub fn commit(&self) -> FsResult<Option<Commit>> {
        match self.commit {
            Some(id) => Ok(Some(self.objects().read_commit(&id)?)),
            None => Ok(None),
        }
    }

    /// The same branch pinned to another commit.
    pub fn at(&self, commit: ObjectId) -> FsResult<FsView> {
        FsView::new(self.repo.clone(), &self.branch, Some(commit))
    }

    fn objects(&self) -> &Arc<dyn ObjectStore> {
        self.repo.objects()
    }

    fn root_tree(&self) -> FsResult<Tree> {
        match self.tree {
            Some(id) => Ok(self.objects().read_tree(&id)?),
            None => Ok(Tree::empty()),
        }
    }

    /// Look up the entry at `path`, or `None` if nothing is there.
    pub fn entry(&self, path: &str) -> FsResult<Option<TreeEntry>> {
        let segments = split_path(path)?;
        let mut tree = self.root_tree()?;
        let (leaf, dirs) = match segments.split_last() {
            Some(split) => split,
            None => return Ok(None),
        };
        for dir in dirs {
            match tree.get(dir) {
                Some(entry) if entry.mode.is_directory() => {
                    tree = self.objects().read_tree(&entry.object_id)?;
                }
                _ => return Ok(None),
            }
        }
        Ok(tree.get(leaf).cloned())
    }

    /// Returns `true` if a file or directory exists at `path`.
    pub fn exists(&self, path: &str) -> FsResult<bool> {
        Ok(self.entry(path)?.is_some())
    }

    /// Read the bytes of the file at `path`.
    pub fn read(&self, path: &str) -> FsResult<Vec<u8>> {
        let entry = self
            .entry(path)?
            .ok_or_else(|| FsError::PathNotFound(path.to_string()))?;
        if entry.mode.is_directory() {
            return Err(FsError::NotAFile(path.to_string()));
        }
        Ok(self.objects().read_blob(&entry.object_id)?)
    }

    /// Size in bytes of the file at `path`, without reading its content.
    pub fn size(&self, path: &str) -> FsResult<u64> {
        let entry = self
            .entry(path)?
            .ok_or_else(|| FsError::PathNotFound(path.to_string()))?;
        if entry.mode.is_directory() {
            return Err(FsError::NotAFile(path.to_string()));
        }
        self.objects()
            .size(&entry.object_id)?
            .ok_or_else(|| StoreError::NotFound(entry.object_id).into())
    }

    /// List the entries of the directory at `dir` (`""` for the root).
    pub fn list(&self, dir: &str) -> FsResult<Vec<TreeEntry>> {
        let mut tree = self.root_tree()?;
        for segment in split_dir(dir)? {
            let entry = tree
                .get(segment)
                .ok_or_else(|| FsError::PathNotFound(dir.to_string()))?;
            if !entry.mode.is_directory() {
                return Err(FsError::NotADirectory(dir.to_string()));
            }
            tree = self.objects().read_tree(&entry.object_id)?;
        }
        Ok(tree.entries)
    }

    /// Write `content` at `path` on top of this view's tree.
    ///
    /// Stores the blob, then rewrites every tree from the leaf up to the
    /// root. Returns the new root tree id; the branch is not moved.
    pub fn stage(&self, path: &str, mode: EntryMode, content: &[u8]) -> FsResult<ObjectId> {
        stage_onto(self.objects().as_ref(), self.tree, path, mode, content)
    }

    /// Apply several writes in order onto one tree.
    pub fn stage_many<'a, I>(&self, changes: I) -> FsResult<ObjectId>
    where
        I: IntoIterator<Item = (&'a str, EntryMode, &'a [u8])>,
    {
        let objects = self.objects().as_ref();
        let mut root = self.tree;
        for (path, mode, content) in changes {
            root = Some(stage_onto(objects, root, path, mode, content)?);
        }
        match root {
            Some(id) => Ok(id),
            None => Ok(objects.store_tree(Vec::new())?),
        }
    }

    /// Store an external directory as a fresh tree (see
    /// [`Repository::store_directory`]).
    pub fn store_directory(&self, source: impl AsRef<std::path::Path>) -> FsResult<ObjectId> {
        self.repo.store_directory(source)
    }

    /// Walk the commit chain from this view's commit back to the root.
    ///
    /// Each call starts a fresh walk.
    pub fn history(&self) -> History {
        History {
            objects: Arc::clone(self.objects()),
            next: self.commit,
        }
    }
}

/// Write one file into the tree `base` (or an empty tree) and return the new
/// root tree id.
pub fn stage_onto(
    objects: &dyn ObjectStore,
    base: Option<ObjectId>,
    path: &str,
    mode: EntryMode,
    content: &[u8],
) -> FsResult<ObjectId> {
    if mode.is_directory() {
        return Err(FsError::NotAFile(path.to_string()));
    }
    let segments = split_path(path)?;
    let blob = objects.store_blob(content)?;
    let id = stage_segments(objects, base, path, &segments, mode, blob)?;
    tracing::debug!(path, %blob, tree = %id, "staged file");
    Ok(id)
}

fn stage_segments(
    objects: &dyn ObjectStore,
    base: Option<ObjectId>,
    path: &str,
    segments: &[&str],
    mode: EntryMode,
    blob: ObjectId,
) -> FsResult<ObjectId> {
    let mut tree = match base {
        Some(id) => objects.read_tree(&id)?,
        None => Tree::empty(),
    };
    let entry = match segments {
        [] => return Err(FsError::PathNotFound(path.to_string())),
        [leaf] => {
            if matches!(tree.get(leaf), Some(existing) if existing.mode.is_directory()) {
                return Err(FsError::NotAFile(path.to_string()));
            }
            TreeEntry::new(mode, *leaf, blob)
        }
        [dir, rest @ ..] => {
            let child = match tree.get(dir) {
                Some(existing) if existing.mode.is_directory() => Some(existing.object_id),
                Some(_) => return Err(FsError::NotADirectory(path.to_string())),
                None => None,
            };
            let child = stage_segments(objects, child, path, rest, mode, blob)?;
            TreeEntry::new(EntryMode::Directory, *dir, child)
        }
    };
    tree.insert(entry);
    Ok(objects.write(&tree.to_stored_object()?)?)
}

/// One step of a history walk.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub id: ObjectId,
    pub commit: Commit,
}

/// Lazy walk over a linear commit chain, newest first.
///
/// Follows the first parent of each commit until a root commit is reached.
/// A read failure is yielded once and ends the walk.
pub struct History {
    objects: Arc<dyn ObjectStore>,
    next: Option<ObjectId>,
}

impl Iterator for History {
    type Item = FsResult<HistoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        match self.objects.read_commit(&id) {
            Ok(commit) => {
                self.next = commit.parent().copied();
                Some(Ok(HistoryEntry { id, commit }))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History").field("next", &self.next).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BRANCH: &str = "refs/documents/42";

    fn seeded() -> (Repository, ObjectId) {
        let repo = Repository::in_memory();
        let view = repo.view(BRANCH).unwrap();
        let tree = view
            .stage_many([
                ("index.rst", EntryMode::Regular, b"v1".as_slice()),
                ("images/logo.png", EntryMode::Regular, b"png".as_slice()),
            ])
            .unwrap();
        let commit = repo.commit(tree, None, "ada", "Create 42").unwrap();
        assert!(repo.refs().create_if_absent(BRANCH, commit).unwrap());
        (repo, commit)
    }

    fn advance(repo: &Repository, content: &[u8]) -> ObjectId {
        let view = repo.view(BRANCH).unwrap();
        let parent = view.commit_id().unwrap();
        let tree = view.stage("index.rst", EntryMode::Regular, content).unwrap();
        let commit = repo.commit(tree, Some(parent), "ada", "Edit 42").unwrap();
        assert!(repo.refs().set_if_equals(BRANCH, parent, commit).unwrap());
        commit
    }

    #[test]
    fn absent_branch_is_empty() {
        let repo = Repository::in_memory();
        let view = repo.view("refs/documents/nobody").unwrap();
        assert!(view.commit_id().is_none());
        assert!(view.commit().unwrap().is_none());
        assert!(view.list("").unwrap().is_empty());
        assert!(matches!(view.read("index.rst"), Err(FsError::PathNotFound(_))));
        assert_eq!(view.history().count(), 0);
    }

    #[test]
    fn read_nested_and_list() {
        let (repo, _) = seeded();
        let view = repo.view(BRANCH).unwrap();
        assert_eq!(view.read("index.rst").unwrap(), b"v1");
        assert_eq!(view.read("images/logo.png").unwrap(), b"png");

        let root: Vec<_> = view.list("").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(root, ["images", "index.rst"]);
        let images = view.list("images").unwrap();
        assert_eq!(images.len(), 1);
        assert!(matches!(view.list("index.rst"), Err(FsError::NotADirectory(_))));
        assert!(matches!(view.list("missing"), Err(FsError::PathNotFound(_))));
    }

    #[test]
    fn read_errors() {
        let (repo, _) = seeded();
        let view = repo.view(BRANCH).unwrap();
        assert!(matches!(view.read("images"), Err(FsError::NotAFile(_))));
        assert!(matches!(view.read("nope.rst"), Err(FsError::PathNotFound(_))));
        assert!(matches!(view.read("index.rst/x"), Err(FsError::PathNotFound(_))));
        assert!(matches!(view.read("../etc"), Err(FsError::InvalidPath { .. })));
    }

    #[test]
    fn size_without_reading() {
        let (repo, _) = seeded();
        let view = repo.view(BRANCH).unwrap();
        assert_eq!(view.size("images/logo.png").unwrap(), 3);
        assert!(matches!(view.size("images"), Err(FsError::NotAFile(_))));
        assert!(matches!(view.size("nope.rst"), Err(FsError::PathNotFound(_))));
    }

    #[test]
    fn stage_does_not_move_ref() {
        let (repo, commit) = seeded();
        let view = repo.view(BRANCH).unwrap();
        let tree = view.stage("index.rst", EntryMode::Regular, b"v2").unwrap();
        assert_ne!(Some(tree), view.tree_id());
        assert_eq!(repo.refs().get(BRANCH).unwrap(), Some(commit));
        assert_eq!(repo.view(BRANCH).unwrap().read("index.rst").unwrap(), b"v1");
    }

    #[test]
    fn stage_rejects_shape_conflicts() {
        let (repo, _) = seeded();
        let view = repo.view(BRANCH).unwrap();
        assert!(matches!(
            view.stage("images", EntryMode::Regular, b"x"),
            Err(FsError::NotAFile(_))
        ));
        assert!(matches!(
            view.stage("index.rst/child", EntryMode::Regular, b"x"),
            Err(FsError::NotADirectory(_))
        ));
        assert!(matches!(
            view.stage("dir", EntryMode::Directory, b""),
            Err(FsError::NotAFile(_))
        ));
    }

    #[test]
    fn pinned_view_ignores_later_commits() {
        let (repo, first) = seeded();
        let pinned = repo.view_at(BRANCH, first).unwrap();
        advance(&repo, b"v2");

        assert_eq!(pinned.read("index.rst").unwrap(), b"v1");
        assert_eq!(repo.view(BRANCH).unwrap().read("index.rst").unwrap(), b"v2");
        assert_eq!(pinned.at(first).unwrap().commit_id(), Some(first));
    }

    #[test]
    fn history_walks_back_to_root() {
        let (repo, first) = seeded();
        let second = advance(&repo, b"v2");
        let third = advance(&repo, b"v3");

        let view = repo.view(BRANCH).unwrap();
        let ids: Vec<ObjectId> = view.history().map(|e| e.unwrap().id).collect();
        assert_eq!(ids, [third, second, first]);

        // Each call walks from the start again.
        assert_eq!(view.history().count(), 3);
        let last = view.history().last().unwrap().unwrap();
        assert!(last.commit.is_root());
        assert_eq!(last.commit.message, "Create 42");
    }

    #[test]
    fn commit_metadata() {
        let (repo, _) = seeded();
        let commit = repo.view(BRANCH).unwrap().commit().unwrap().unwrap();
        assert_eq!(commit.author, "ada");
        assert_eq!(commit.message, "Create 42");
    }

    #[test]
    fn stage_many_on_empty_view() {
        let repo = Repository::in_memory();
        let view = repo.view(BRANCH).unwrap();
        let empty = view
            .stage_many(std::iter::empty::<(&str, EntryMode, &[u8])>())
            .unwrap();
        assert!(repo.objects().read_tree(&empty).unwrap().is_empty());
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,7}"
    }

    proptest! {
        #[test]
        fn stage_then_read_is_path_local(
            dirs in proptest::collection::vec(segment(), 0..3),
            name in segment(),
            content in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let (repo, _) = seeded();
            let view = repo.view(BRANCH).unwrap();
            let mut parts = dirs.clone();
            parts.push(format!("{name}.txt"));
            let path = parts.join("/");

            let tree = view.stage(&path, EntryMode::Regular, &content).unwrap();
            let commit = repo.commit(tree, view.commit_id(), "prop", "stage").unwrap();
            let staged = repo.view_at(BRANCH, commit).unwrap();

            prop_assert_eq!(staged.read(&path).unwrap(), content);
            prop_assert_eq!(staged.read("images/logo.png").unwrap(), b"png".to_vec());
            prop_assert_eq!(staged.read("index.rst").unwrap(), b"v1".to_vec());
        }
    }
}
