use std::fmt;
use std::sync::Arc;

use folio_fs::Repository;
use folio_refs::{validate_ref_component, RefError};
use folio_store::ObjectKind;
use folio_types::ObjectId;

use crate::document::{Document, Target};
use crate::error::{DocResult, DocumentError};
use crate::id_template::Bindings;
use crate::registry::{DocumentType, Registry};

/// Author recorded when neither the caller nor the configuration names one.
pub const DEFAULT_AUTHOR: &str = "Folio <folio@localhost>";

/// Route prefix of the static resource endpoint.
pub const DEFAULT_RESOURCE_PREFIX: &str = "/_resource";

/// Optional author and message for a new commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitMeta {
    pub author: Option<String>,
    pub message: Option<String>,
}

impl CommitMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub(crate) fn author_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.author.as_deref().unwrap_or(default)
    }

    pub(crate) fn message_or(&self, verb: &str, id: &str) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("{verb} {id}"))
    }
}

/// Everything a document operation needs: the repository, the registered
/// document types and the defaults for new commits.
///
/// Cheap to clone; clones share the repository and registry.
#[derive(Clone)]
pub struct Context {
    repo: Repository,
    registry: Arc<Registry>,
    default_author: String,
    resource_prefix: String,
}

impl Context {
    pub fn new(repo: Repository, registry: Registry) -> Self {
        Self {
            repo,
            registry: Arc::new(registry),
            default_author: DEFAULT_AUTHOR.to_string(),
            resource_prefix: DEFAULT_RESOURCE_PREFIX.to_string(),
        }
    }

    pub fn with_default_author(mut self, author: impl Into<String>) -> Self {
        self.default_author = author.into();
        self
    }

    pub fn with_resource_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resource_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn default_author(&self) -> &str {
        &self.default_author
    }

    pub fn resource_prefix(&self) -> &str {
        &self.resource_prefix
    }

    pub fn document_type(&self, name: &str) -> DocResult<Arc<DocumentType>> {
        self.registry.get(name)
    }

    /// Resolve a document to a commit id.
    ///
    /// An explicit `version` must name a commit in the store; otherwise the
    /// tip of the target branch is returned, or `None` if it does not exist.
    /// Nothing is cached, so calling this again after a ref update sees the
    /// new tip.
    pub fn resolve(
        &self,
        id: &str,
        target: Target,
        version: Option<ObjectId>,
    ) -> DocResult<Option<ObjectId>> {
        validate_document_id(id)?;
        match version {
            Some(version) => {
                self.check_commit(version)?;
                Ok(Some(version))
            }
            None => Ok(self.repo.refs().get(&target.branch(id))?),
        }
    }

    fn check_commit(&self, version: ObjectId) -> DocResult<()> {
        let invalid = |reason: &str| DocumentError::InvalidVersion {
            version: version.to_hex(),
            reason: reason.to_string(),
        };
        match self.repo.objects().read(&version)? {
            Some(obj) if obj.kind == ObjectKind::Commit => Ok(()),
            Some(_) => Err(invalid("not a commit")),
            None => Err(invalid("unknown commit")),
        }
    }

    /// Open a document on its live branch.
    pub fn open(
        &self,
        doc_type: &str,
        id: &str,
        version: Option<ObjectId>,
    ) -> DocResult<Document> {
        self.open_target(doc_type, id, Target::Live, version)
    }

    /// Open a document on its archive branch.
    pub fn open_archive(
        &self,
        doc_type: &str,
        id: &str,
        version: Option<ObjectId>,
    ) -> DocResult<Document> {
        self.open_target(doc_type, id, Target::Archive, version)
    }

    pub fn open_target(
        &self,
        doc_type: &str,
        id: &str,
        target: Target,
        version: Option<ObjectId>,
    ) -> DocResult<Document> {
        let doc_type = self.document_type(doc_type)?;
        let commit = self.resolve(id, target, version)?;
        Document::load(self.clone(), doc_type, id.to_string(), target, commit)
    }

    /// Open a document whose id is computed from the type's id template.
    pub fn open_from(
        &self,
        doc_type: &str,
        bindings: &Bindings,
        version: Option<ObjectId>,
    ) -> DocResult<Document> {
        let id = self.document_type(doc_type)?.document_id(bindings)?;
        self.open(doc_type, &id, version)
    }

    /// Create a document from its type's model directory.
    ///
    /// Returns `false` if the id is already in use; the existing branch is
    /// left untouched.
    pub fn create(&self, doc_type: &str, id: &str, meta: &CommitMeta) -> DocResult<bool> {
        let doc_type = self.document_type(doc_type)?;
        validate_document_id(id)?;

        let tree = self.repo.store_directory(&doc_type.model)?;
        let message = meta.message_or("Create", id);
        let commit = self.repo.commit(
            tree,
            None,
            meta.author_or(&self.default_author),
            &message,
        )?;
        let branch = Target::Live.branch(id);
        let created = self.repo.refs().create_if_absent(&branch, commit)?;
        if created {
            tracing::info!(document_type = %doc_type.name, id, %commit, "created document");
        } else {
            tracing::info!(document_type = %doc_type.name, id, "document id already in use");
        }
        Ok(created)
    }

    /// Create a document whose id is computed from the type's id template.
    ///
    /// Returns the computed id and whether it was created.
    pub fn create_from(
        &self,
        doc_type: &str,
        bindings: &Bindings,
        meta: &CommitMeta,
    ) -> DocResult<(String, bool)> {
        let id = self.document_type(doc_type)?.document_id(bindings)?;
        let created = self.create(doc_type, &id, meta)?;
        Ok((id, created))
    }

    /// Ids of all documents with a live branch, sorted.
    pub fn document_ids(&self) -> DocResult<Vec<String>> {
        let prefix = Target::Live.namespace();
        Ok(self
            .repo
            .refs()
            .list(prefix)?
            .into_iter()
            .filter_map(|(name, _)| name.strip_prefix(prefix).map(str::to_string))
            .collect())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("repository", &self.repo)
            .field("document_types", &self.registry.len())
            .field("default_author", &self.default_author)
            .field("resource_prefix", &self.resource_prefix)
            .finish()
    }
}

/// Check that `id` maps to a ref inside the document namespaces.
pub fn validate_document_id(id: &str) -> DocResult<()> {
    validate_ref_component(id).map_err(|e| match e {
        RefError::InvalidRefName { reason, .. } => DocumentError::InvalidId {
            id: id.to_string(),
            reason,
        },
        other => DocumentError::Ref(other),
    })
}

/// Parse a user-supplied version. The empty string means "current tip".
pub fn parse_version(version: &str) -> DocResult<Option<ObjectId>> {
    let version = version.trim();
    if version.is_empty() {
        return Ok(None);
    }
    version
        .parse::<ObjectId>()
        .map(Some)
        .map_err(|e| DocumentError::InvalidVersion {
            version: version.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn context() -> (tempfile::TempDir, Context) {
        let models = tempfile::tempdir().unwrap();
        fs::create_dir(models.path().join("report")).unwrap();
        fs::write(models.path().join("report/index.rst.hbs"), "Report\n======\n").unwrap();

        let mut registry = Registry::with_model_root(models.path());
        registry
            .register(DocumentType::new("Report", "report").with_id_template("report-{n}"))
            .unwrap();
        (models, Context::new(Repository::in_memory(), registry))
    }

    #[test]
    fn create_uses_default_author_and_message() {
        let (_models, ctx) = context();
        assert!(ctx.create("Report", "1", &CommitMeta::new()).unwrap());
        let doc = ctx.open("Report", "1", None).unwrap();
        assert_eq!(doc.author(), Some(DEFAULT_AUTHOR));
        assert_eq!(doc.message(), Some("Create 1"));
    }

    #[test]
    fn create_with_explicit_meta() {
        let (_models, ctx) = context();
        let meta = CommitMeta::new().author("Ada <ada@example.org>").message("first draft");
        assert!(ctx.create("Report", "1", &meta).unwrap());
        let doc = ctx.open("Report", "1", None).unwrap();
        assert_eq!(doc.author(), Some("Ada <ada@example.org>"));
        assert_eq!(doc.message(), Some("first draft"));
    }

    #[test]
    fn configured_default_author() {
        let (_models, ctx) = context();
        let ctx = ctx.with_default_author("Office <office@example.org>");
        ctx.create("Report", "1", &CommitMeta::new()).unwrap();
        assert_eq!(
            ctx.open("Report", "1", None).unwrap().author(),
            Some("Office <office@example.org>")
        );
    }

    #[test]
    fn invalid_ids_rejected_before_mutation() {
        let (_models, ctx) = context();
        for id in ["/", "", "../x", "a b", "x.lock", "a.lock/b", "a/b.lock/c"] {
            assert!(
                matches!(
                    ctx.create("Report", id, &CommitMeta::new()),
                    Err(DocumentError::InvalidId { .. })
                ),
                "{id:?} accepted"
            );
        }
        assert!(ctx.repository().refs().list("").unwrap().is_empty());
    }

    #[test]
    fn create_from_bindings() {
        let (_models, ctx) = context();
        let bindings = Bindings::from([("n".to_string(), "7".to_string())]);
        let (id, created) = ctx
            .create_from("Report", &bindings, &CommitMeta::new())
            .unwrap();
        assert_eq!(id, "report-7");
        assert!(created);
        let doc = ctx.open_from("Report", &bindings, None).unwrap();
        assert_eq!(doc.id(), "report-7");
        assert!(doc.exists());
    }

    #[test]
    fn unknown_type() {
        let (_models, ctx) = context();
        assert!(matches!(
            ctx.create("Nope", "1", &CommitMeta::new()),
            Err(DocumentError::UnknownType(_))
        ));
    }

    #[test]
    fn resolve_tracks_the_tip() {
        let (_models, ctx) = context();
        assert_eq!(ctx.resolve("1", Target::Live, None).unwrap(), None);
        ctx.create("Report", "1", &CommitMeta::new()).unwrap();
        let tip = ctx.resolve("1", Target::Live, None).unwrap().unwrap();
        assert_eq!(ctx.resolve("1", Target::Live, Some(tip)).unwrap(), Some(tip));
        assert_eq!(ctx.resolve("1", Target::Archive, None).unwrap(), None);
    }

    #[test]
    fn resolve_rejects_unknown_versions() {
        let (_models, ctx) = context();
        ctx.create("Report", "1", &CommitMeta::new()).unwrap();
        let blob = ctx.repository().objects().store_blob(b"not a commit").unwrap();
        assert!(matches!(
            ctx.resolve("1", Target::Live, Some(blob)),
            Err(DocumentError::InvalidVersion { .. })
        ));
        assert!(matches!(
            ctx.resolve("1", Target::Live, Some(ObjectId::from_bytes(b"nothing"))),
            Err(DocumentError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn lists_document_ids() {
        let (_models, ctx) = context();
        ctx.create("Report", "b", &CommitMeta::new()).unwrap();
        ctx.create("Report", "a", &CommitMeta::new()).unwrap();
        assert_eq!(ctx.document_ids().unwrap(), ["a", "b"]);
    }

    #[test]
    fn parses_versions() {
        assert_eq!(parse_version("").unwrap(), None);
        assert_eq!(parse_version("  ").unwrap(), None);
        let id = ObjectId::from_bytes(b"x");
        assert_eq!(parse_version(&id.to_hex()).unwrap(), Some(id));
        assert!(matches!(
            parse_version("zz"),
            Err(DocumentError::InvalidVersion { .. })
        ));
    }
}
