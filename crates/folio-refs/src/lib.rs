//! Reference management for Folio.
//!
//! A ref is a mutable, named pointer to a commit id and the only mutable
//! state in a repository. Documents keep their live history on
//! `refs/documents/<id>` and their archive snapshots on `refs/archives/<id>`.
//!
//! # Concurrency
//!
//! There is no separate locking layer above this crate. Both mutating
//! operations are atomic and linearizable per ref name:
//!
//! - [`RefStore::create_if_absent`] creates a ref only if it is unset.
//! - [`RefStore::set_if_equals`] moves a ref only if it still points at the
//!   caller's expected commit (compare-and-swap).
//!
//! Callers detect races through the `false` return value instead of holding
//! locks across a read-modify-write cycle.
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`traits`]: The [`RefStore`] trait defining the storage interface
//! - [`names`]: Ref name validation
//! - [`memory`]: In-memory [`InMemoryRefStore`]
//! - [`disk`]: Lock-file based [`DiskRefStore`]

pub mod disk;
pub mod error;
pub mod memory;
pub mod names;
pub mod traits;

pub use disk::DiskRefStore;
pub use error::{RefError, Result};
pub use memory::InMemoryRefStore;
pub use names::{validate_ref_component, validate_ref_name};
pub use traits::RefStore;
