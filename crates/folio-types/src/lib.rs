//! Foundation types for Folio.
//!
//! Every other Folio crate depends on `folio-types` for [`ObjectId`], the
//! content address shared by blobs, trees and commits.

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::ObjectId;
