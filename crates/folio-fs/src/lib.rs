//! Snapshot views over a Folio repository.
//!
//! A [`Repository`] pairs an object store with a ref store. An [`FsView`]
//! resolves one branch (or an explicitly pinned commit) to an immutable
//! snapshot and exposes it as a small filesystem:
//!
//! - [`FsView::read`] / [`FsView::list`] resolve paths through the snapshot's
//!   root tree.
//! - [`FsView::stage`] writes a blob and rewrites every tree on the path up
//!   to the root, returning a new root tree without moving any ref.
//! - [`FsView::history`] lazily walks the commit chain back to the root.
//!
//! Committing a staged tree and moving the branch is left to the caller,
//! which is what lets the document layer choose between create-if-absent and
//! compare-and-swap.

pub mod error;
pub mod path;
pub mod repository;
pub mod view;

pub use error::{FsError, FsResult};
pub use path::{split_dir, split_path};
pub use repository::{Repository, MARKER_FILE};
pub use view::{stage_onto, FsView, History, HistoryEntry};
