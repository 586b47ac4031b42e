//! File-backed reference store using git-style lock files.
//!
//! Each ref is a file `<root>/<name>` holding the hex commit id and a
//! trailing newline. Mutations take `<root>/<name>.lock` with an exclusive
//! create, compare the current value while holding it, write the new value
//! into the lock file and rename it over the ref. The rename both publishes
//! the new value and releases the lock.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use folio_types::ObjectId;
use walkdir::WalkDir;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;

/// How many times a writer retries a held lock before giving up.
const LOCK_ATTEMPTS: u32 = 40;

/// Base delay between lock attempts; grows linearly per attempt.
const LOCK_BACKOFF: Duration = Duration::from_millis(5);

/// A ref store rooted at a directory on disk.
///
/// Safe for concurrent use by several threads or processes on the same
/// directory. A crashed writer can leave a stale `.lock` file behind; it is
/// never removed automatically, and writers to that ref fail with
/// [`RefError::Locked`] until it is deleted by hand.
#[derive(Debug, Clone)]
pub struct DiskRefStore {
    root: PathBuf,
}

/// A held ref lock. Dropping it without committing removes the lock file.
struct RefLock {
    path: PathBuf,
    file: Option<File>,
}

impl RefLock {
    /// Publish `commit` as the ref's new value and release the lock.
    fn commit(mut self, target: &Path, commit: ObjectId) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            writeln!(file, "{}", commit.to_hex())?;
            file.sync_all()?;
        }
        fs::rename(&self.path, target)?;
        // Renamed away, nothing left to clean up.
        self.path = PathBuf::new();
        Ok(())
    }
}

impl Drop for RefLock {
    fn drop(&mut self) {
        self.file.take();
        if !self.path.as_os_str().is_empty() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove ref lock");
            }
        }
    }
}

impl DiskRefStore {
    /// Open (or create) a ref directory at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory holding the ref files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.lock"))
    }

    fn read_value(&self, name: &str, path: &Path) -> Result<Option<ObjectId>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        ObjectId::from_hex(&text)
            .map(Some)
            .map_err(|e| RefError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn acquire(&self, name: &str) -> Result<RefLock> {
        let path = self.lock_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        for attempt in 1..=LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    return Ok(RefLock {
                        path,
                        file: Some(file),
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(name, attempt, "ref lock held, retrying");
                    thread::sleep(LOCK_BACKOFF * attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::warn!(name, lock = %path.display(), "gave up waiting for ref lock");
        Err(RefError::Locked {
            name: name.to_string(),
        })
    }

    /// Lock `name`, check its current value with `accept`, and publish `new`
    /// if accepted.
    fn locked_update(
        &self,
        name: &str,
        new: ObjectId,
        accept: impl FnOnce(Option<ObjectId>) -> bool,
    ) -> Result<bool> {
        validate_ref_name(name)?;
        let lock = self.acquire(name)?;
        let path = self.ref_path(name);
        let current = self.read_value(name, &path)?;
        if !accept(current) {
            tracing::debug!(name, ?current, "ref update rejected");
            return Ok(false);
        }
        lock.commit(&path, new)?;
        tracing::debug!(name, ?current, %new, "updated ref");
        Ok(true)
    }
}

impl RefStore for DiskRefStore {
    fn get(&self, name: &str) -> Result<Option<ObjectId>> {
        validate_ref_name(name)?;
        self.read_value(name, &self.ref_path(name))
    }

    fn create_if_absent(&self, name: &str, commit: ObjectId) -> Result<bool> {
        self.locked_update(name, commit, |current| current.is_none())
    }

    fn set_if_equals(&self, name: &str, expected: ObjectId, new: ObjectId) -> Result<bool> {
        self.locked_update(name, new, |current| current == Some(expected))
    }

    fn list(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>> {
        let mut refs = Vec::new();
        // Every valid name starts with `refs/`.
        let namespace = self.root.join("refs");
        if !namespace.is_dir() {
            return Ok(refs);
        }
        for entry in WalkDir::new(&namespace).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                RefError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(ErrorKind::Other, "ref directory walk failed")
                }))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if name.ends_with(".lock") || !name.starts_with(prefix) {
                continue;
            }
            if validate_ref_name(&name).is_err() {
                continue;
            }
            if let Some(id) = self.read_value(&name, entry.path())? {
                refs.push((name, id));
            }
        }
        refs.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(refs)
    }
}
