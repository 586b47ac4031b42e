use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use folio_fs::{FsView, History};
use folio_store::{Commit, EntryMode, TreeEntry};
use folio_types::ObjectId;
use serde::Serialize;

use crate::context::{CommitMeta, Context};
use crate::error::{DocResult, DocumentError};
use crate::registry::DocumentType;

/// Which of a document's two refs a handle reads and writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// `refs/documents/<id>`: the live, editable history.
    #[default]
    Live,
    /// `refs/archives/<id>`: explicitly archived snapshots.
    Archive,
}

impl Target {
    /// Ref namespace of this target, with trailing slash.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Live => "refs/documents/",
            Self::Archive => "refs/archives/",
        }
    }

    /// Full ref name for document `id`.
    pub fn branch(&self, id: &str) -> String {
        format!("{}{id}", self.namespace())
    }
}

/// Result of a guarded write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditOutcome {
    /// The ref now points at `commit`.
    Saved { commit: ObjectId },
    /// The ref moved since the caller's version was read; nothing was
    /// published. `current` is the tip seen right after the failed swap.
    Conflict { current: Option<ObjectId> },
}

impl EditOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// A document handle pinned to one commit of one of its refs.
///
/// Handles are recomputed per request and never persisted. Everything a
/// handle reads, including resource addresses, resolves against its pinned
/// commit, so a handle taken before an edit keeps seeing the old snapshot.
#[derive(Clone, Debug)]
pub struct Document {
    ctx: Context,
    doc_type: Arc<DocumentType>,
    id: String,
    target: Target,
    view: FsView,
    commit: Option<Commit>,
}

impl Document {
    pub(crate) fn load(
        ctx: Context,
        doc_type: Arc<DocumentType>,
        id: String,
        target: Target,
        version: Option<ObjectId>,
    ) -> DocResult<Self> {
        let branch = target.branch(&id);
        let view = match version {
            Some(commit) => ctx.repository().view_at(&branch, commit)?,
            None => ctx.repository().view(&branch)?,
        };
        let commit = view.commit()?;
        Ok(Self {
            ctx,
            doc_type,
            id,
            target,
            view,
            commit,
        })
    }

    pub fn document_type(&self) -> &DocumentType {
        &self.doc_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// The ref this handle belongs to.
    pub fn branch(&self) -> &str {
        self.view.branch()
    }

    pub fn archive_branch(&self) -> String {
        Target::Archive.branch(&self.id)
    }

    /// The pinned commit, or `None` if the ref did not exist when resolved.
    pub fn version(&self) -> Option<ObjectId> {
        self.view.commit_id()
    }

    pub fn exists(&self) -> bool {
        self.commit.is_some()
    }

    pub fn author(&self) -> Option<&str> {
        self.commit.as_ref().map(|c| c.author.as_str())
    }

    pub fn message(&self) -> Option<&str> {
        self.commit.as_ref().map(|c| c.message.as_str())
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.commit.as_ref().map(|c| c.timestamp)
    }

    /// The snapshot view backing this handle.
    pub fn view(&self) -> &FsView {
        &self.view
    }

    /// The part edited or rendered by default for this handle's target.
    pub fn default_part(&self) -> &str {
        match self.target {
            Target::Live => &self.doc_type.edit_part,
            Target::Archive => &self.doc_type.archive_part,
        }
    }

    fn require_version(&self) -> DocResult<ObjectId> {
        self.version().ok_or_else(|| DocumentError::NotFound {
            document_type: self.doc_type.name.clone(),
            id: self.id.clone(),
        })
    }

    /// The same document pinned to another commit of the same ref.
    pub fn at(&self, version: ObjectId) -> DocResult<Document> {
        self.ctx
            .open_target(&self.doc_type.name, &self.id, self.target, Some(version))
    }

    /// Read the file at `path` from the pinned snapshot.
    pub fn read(&self, path: &str) -> DocResult<Vec<u8>> {
        self.require_version()?;
        Ok(self.view.read(path)?)
    }

    /// Size of a file in bytes, without reading it.
    pub fn size(&self, path: &str) -> DocResult<u64> {
        self.require_version()?;
        Ok(self.view.size(path)?)
    }

    /// Read a file as UTF-8 text, replacing invalid sequences.
    pub fn read_to_string(&self, path: &str) -> DocResult<String> {
        Ok(String::from_utf8_lossy(&self.read(path)?).into_owned())
    }

    /// List a directory of the pinned snapshot (`""` for the root).
    pub fn list(&self, dir: &str) -> DocResult<Vec<TreeEntry>> {
        self.require_version()?;
        Ok(self.view.list(dir)?)
    }

    /// Handles for every commit on this handle's ref, newest first.
    ///
    /// The walk starts at the current tip of the ref, not at the pinned
    /// commit.
    pub fn history(&self) -> DocResult<DocumentHistory> {
        self.history_of(self.target)
    }

    /// Handles for every archived snapshot, newest first.
    pub fn archive_history(&self) -> DocResult<DocumentHistory> {
        self.history_of(Target::Archive)
    }

    fn history_of(&self, target: Target) -> DocResult<DocumentHistory> {
        let tip = self.ctx.repository().view(&target.branch(&self.id))?;
        Ok(DocumentHistory {
            ctx: self.ctx.clone(),
            doc_type: Arc::clone(&self.doc_type),
            id: self.id.clone(),
            target,
            inner: tip.history(),
        })
    }

    /// URL of the resource route serving `path` at the pinned commit.
    pub fn resource_url(&self, path: &str) -> DocResult<String> {
        let version = self.require_version()?;
        let path = folio_fs::split_path(path)?
            .into_iter()
            .map(encode_segment)
            .collect::<Vec<_>>()
            .join("/");
        Ok(format!(
            "{}/{}/{}/{}/{}",
            self.ctx.resource_prefix(),
            encode_segment(&self.doc_type.name),
            encode_segment(&self.id),
            version,
            path
        ))
    }

    /// The file at `path` as a self-contained `data:` URI.
    ///
    /// The whole file is inlined, so this is meant for small resources such
    /// as logos embedded in a PDF.
    pub fn resource_base64(&self, path: &str) -> DocResult<String> {
        let data = self.read(path)?;
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        Ok(format!("data:{mime};base64,{}", STANDARD.encode(data)))
    }

    fn entry_mode(&self, path: &str) -> DocResult<EntryMode> {
        Ok(match self.view.entry(path)? {
            Some(entry) if entry.mode == EntryMode::Executable => EntryMode::Executable,
            _ => EntryMode::Regular,
        })
    }

    /// Write `content` at `path` on top of the pinned commit and move this
    /// handle's ref from the pinned commit to the result.
    ///
    /// If the ref no longer points at the pinned commit the write is
    /// discarded and [`EditOutcome::Conflict`] is returned; the caller must
    /// re-read and resubmit.
    pub fn edit(&self, path: &str, content: &[u8], meta: &CommitMeta) -> DocResult<EditOutcome> {
        self.edit_many(&[(path, content)], meta)
    }

    /// Apply several writes as one commit with one compare-and-swap.
    pub fn edit_many(&self, changes: &[(&str, &[u8])], meta: &CommitMeta) -> DocResult<EditOutcome> {
        let expected = self.require_version()?;
        let mut staged = Vec::with_capacity(changes.len());
        for (path, content) in changes {
            staged.push((*path, self.entry_mode(path)?, *content));
        }
        let tree = self.view.stage_many(staged)?;

        let message = meta.message_or("Edit", &self.id);
        let author = meta.author_or(self.ctx.default_author());
        let commit = self
            .ctx
            .repository()
            .commit(tree, Some(expected), author, &message)?;

        let refs = self.ctx.repository().refs();
        if refs.set_if_equals(self.branch(), expected, commit)? {
            tracing::info!(branch = self.branch(), from = %expected, to = %commit, "saved edit");
            Ok(EditOutcome::Saved { commit })
        } else {
            let current = refs.get(self.branch())?;
            tracing::warn!(branch = self.branch(), %expected, ?current, "edit conflict");
            Ok(EditOutcome::Conflict { current })
        }
    }

    /// Store `content` at `path` on top of the pinned snapshot and publish
    /// it on the archive ref.
    ///
    /// The new archive commit's parent is the archive tip observed at the
    /// start of the call, and the ref only moves if it still points there,
    /// so two concurrent archivals cannot silently overwrite each other.
    pub fn archive(&self, path: &str, content: &[u8], meta: &CommitMeta) -> DocResult<EditOutcome> {
        self.require_version()?;
        let branch = self.archive_branch();
        let repo = self.ctx.repository();
        let parent = repo.refs().get(&branch)?;

        let tree = self.view.stage(path, EntryMode::Regular, content)?;
        let message = meta.message_or("Archive", &self.id);
        let author = meta.author_or(self.ctx.default_author());
        let commit = repo.commit(tree, parent, author, &message)?;

        if repo.refs().update(&branch, parent, commit)? {
            tracing::info!(branch = %branch, ?parent, %commit, "archived document");
            Ok(EditOutcome::Saved { commit })
        } else {
            let current = repo.refs().get(&branch)?;
            tracing::warn!(branch = %branch, ?parent, ?current, "archive conflict");
            Ok(EditOutcome::Conflict { current })
        }
    }
}

/// Percent-encode one URL path segment. Everything outside the unreserved
/// and sub-delimiter sets is escaped, `/` included.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => out.push(byte as char),
            b'-' | b'.' | b'_' | b'~' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*'
            | b'+' | b',' | b';' | b'=' | b':' | b'@' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Lazy sequence of document handles, one per commit, newest first.
#[derive(Debug)]
pub struct DocumentHistory {
    ctx: Context,
    doc_type: Arc<DocumentType>,
    id: String,
    target: Target,
    inner: History,
}

impl Iterator for DocumentHistory {
    type Item = DocResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e.into())),
        };
        Some(Document::load(
            self.ctx.clone(),
            Arc::clone(&self.doc_type),
            self.id.clone(),
            self.target,
            Some(entry.id),
        ))
    }
}
