//! HTTP surface for Folio.
//!
//! Serves document metadata, history and parts as JSON, accepts batch
//! updates, and hosts the resource route that rendered documents link to.
//! Resource URLs carry a commit id, so a page keeps loading the files of the
//! snapshot it was rendered from after the document moves on.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, DocumentSummary, HealthResponse};
pub use router::build_router;
pub use server::FolioServer;
