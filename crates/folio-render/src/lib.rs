//! Rendering for Folio documents.
//!
//! A [`Renderer`] expands a document part with a [`TemplateEngine`], then
//! hands the markup to a [`RestToHtml`] converter and the resulting page to
//! an [`HtmlToPdf`] converter. Templates, partials and resources are read
//! from the document handle's pinned snapshot.

pub mod convert;
pub mod engine;
pub mod error;
pub mod renderer;

pub use convert::{CommandConverter, HtmlParts, HtmlToPdf, RestToHtml};
pub use engine::{HandlebarsEngine, Resources, TemplateEngine, TemplateInput};
pub use error::{RenderError, RenderResult};
pub use renderer::{strip_template_extension, Renderer, ResourceMode, TEMPLATE_EXTENSION};
