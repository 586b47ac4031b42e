//! Content-addressed object storage for Folio.
//!
//! This crate implements a hash-keyed object store modeled on git's
//! `.git/objects/` directory. Document contents, directory listings and
//! history nodes are stored as immutable objects identified by their BLAKE3
//! hash (domain-separated by object kind).
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- one directory level, mapping names to `(mode, id)` pairs
//! - [`Commit`] -- a snapshot: root tree, parents, author, message, timestamp
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`DiskObjectStore`] -- sharded loose-object directory on disk
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writing an object that already exists is a successful no-op.
//! 3. A commit is written only after its tree and parents exist.
//! 4. Concurrent reads are always safe, and racing writes of the same
//!    content collapse to one object.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod disk;
pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use disk::DiskObjectStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
