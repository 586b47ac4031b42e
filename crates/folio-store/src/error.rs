use folio_types::ObjectId;

use crate::object::ObjectKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no object {0} in the store")]
    NotFound(ObjectId),

    /// The bytes on disk no longer hash to the name they are stored under.
    #[error("object {id} is damaged: its content hashes to {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    #[error("could not encode object: {0}")]
    Serialization(String),

    #[error("object store I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Wrong kind tag, or a tree/commit payload that does not decode.
    #[error("object {id} is unreadable: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A commit names a tree or parent that has not been stored.
    #[error("commit points at {kind} {id}, which is not in the store")]
    MissingDependency { kind: ObjectKind, id: ObjectId },

    #[error("refusing to store an object whose id is null")]
    NullObjectId,
}

pub type StoreResult<T> = Result<T, StoreError>;
