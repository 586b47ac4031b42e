//! Versioned documents on top of a Folio repository.
//!
//! A document is identified by `(document_type, document_id)` and owns two
//! refs: `refs/documents/<id>` for its live history and `refs/archives/<id>`
//! for archived snapshots. Every write builds a new tree and commit, then
//! moves a ref with an atomic primitive:
//!
//! | Operation | Ref update |
//! |---|---|
//! | [`Context::create`] | create-if-absent on the live ref (`false` = id taken) |
//! | [`Document::edit`] | compare-and-swap from the handle's pinned commit |
//! | [`Document::archive`] | compare-and-swap from the archive tip seen at start |
//! | [`Context::update_content`] | one compare-and-swap per document in the batch |
//!
//! A lost swap is reported as [`EditOutcome::Conflict`]. Nothing is retried
//! or merged; the caller re-reads and resubmits.
//!
//! # Example
//!
//! ```no_run
//! use folio_document::{CommitMeta, Context, DocumentType, Registry};
//! use folio_fs::Repository;
//!
//! let mut registry = Registry::with_model_root("/srv/app");
//! registry.register(DocumentType::new("EmployeeDoc", "models/employee"))?;
//! let ctx = Context::new(Repository::open("/srv/app/documents")?, registry);
//!
//! ctx.create("EmployeeDoc", "42", &CommitMeta::new())?;
//! let doc = ctx.open("EmployeeDoc", "42", None)?;
//! let outcome = doc.edit("index.rst.hbs", b"New text", &CommitMeta::new())?;
//! assert!(outcome.is_saved());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod context;
pub mod document;
pub mod error;
pub mod id_template;
pub mod registry;

pub use batch::{UpdateItem, UpdateRequest, UpdateResult};
pub use context::{
    parse_version, validate_document_id, CommitMeta, Context, DEFAULT_AUTHOR,
    DEFAULT_RESOURCE_PREFIX,
};
pub use document::{Document, DocumentHistory, EditOutcome, Target};
pub use error::{DocResult, DocumentError};
pub use id_template::Bindings;
pub use registry::{DocumentType, Registry, DEFAULT_ARCHIVE_PART, DEFAULT_EDIT_PART};
