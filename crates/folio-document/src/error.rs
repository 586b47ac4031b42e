use folio_fs::FsError;
use folio_refs::RefError;
use folio_store::StoreError;
use folio_types::ObjectId;

/// Errors from document operations.
///
/// Conflicts and duplicate ids are not errors: they are ordinary outcomes
/// ([`crate::EditOutcome::Conflict`], `create` returning `false`).
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// No document type is registered under this name.
    #[error("unknown document type: {0}")]
    UnknownType(String),

    /// A document type with this name is already registered.
    #[error("document type already registered: {0}")]
    DuplicateType(String),

    /// A document type name that cannot appear in a resource route.
    #[error("invalid document type name {name:?}: {reason}")]
    InvalidTypeName { name: String, reason: String },

    /// A document id that does not map to a ref inside the document namespace.
    #[error("invalid document id {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    /// An id template placeholder with no value in the bindings.
    #[error("id template {template:?} needs a value for {name:?}")]
    MissingBinding { template: String, name: String },

    /// An id template with unbalanced braces or an empty placeholder.
    #[error("malformed id template {template:?}: {reason}")]
    MalformedTemplate { template: String, reason: String },

    /// The document's branch does not exist.
    #[error("document not found: {document_type}/{id}")]
    NotFound { document_type: String, id: String },

    /// A version string that is not a known commit id.
    #[error("invalid version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    /// The path does not exist in the resolved snapshot.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// An object reachable from a ref is missing from the store.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("filesystem view error: {0}")]
    Fs(FsError),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),
}

impl DocumentError {
    /// Returns `true` for store corruption: an object that a ref or tree
    /// promises is missing or damaged. Everything else is a caller error or
    /// an I/O failure.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ObjectNotFound(_) => true,
            Self::Store(e) | Self::Fs(FsError::Store(e)) => store_is_fatal(e),
            _ => false,
        }
    }
}

fn store_is_fatal(e: &StoreError) -> bool {
    matches!(
        e,
        StoreError::NotFound(_)
            | StoreError::HashMismatch { .. }
            | StoreError::CorruptObject { .. }
            | StoreError::MissingDependency { .. }
    )
}

impl From<StoreError> for DocumentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::ObjectNotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<FsError> for DocumentError {
    fn from(e: FsError) -> Self {
        match e {
            FsError::PathNotFound(path) => Self::PathNotFound(path),
            FsError::Store(e) => e.into(),
            FsError::Ref(e) => Self::Ref(e),
            other => Self::Fs(other),
        }
    }
}

/// Result alias for document operations.
pub type DocResult<T> = Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_objects_are_fatal() {
        let id = ObjectId::from_bytes(b"gone");
        let err: DocumentError = FsError::Store(StoreError::NotFound(id)).into();
        assert!(matches!(err, DocumentError::ObjectNotFound(x) if x == id));
        assert!(err.is_fatal());

        let corrupt: DocumentError = StoreError::CorruptObject {
            id,
            reason: "bad".into(),
        }
        .into();
        assert!(corrupt.is_fatal());
    }

    #[test]
    fn caller_errors_are_not_fatal() {
        let err: DocumentError = FsError::PathNotFound("index.rst".into()).into();
        assert!(matches!(err, DocumentError::PathNotFound(ref p) if p == "index.rst"));
        assert!(!err.is_fatal());
        assert!(!DocumentError::UnknownType("X".into()).is_fatal());
        assert!(!DocumentError::InvalidId {
            id: "/".into(),
            reason: "empty".into()
        }
        .is_fatal());
    }
}
