//! The rendering pipeline: template expansion, ReST to HTML, HTML to PDF.
//!
//! Every stage reads from one [`Document`] handle, so the templates, the
//! partials and the embedded resource addresses all come from the same
//! pinned snapshot.

use std::sync::Arc;

use folio_document::{CommitMeta, Document, EditOutcome, Target};
use folio_store::EntryMode;
use serde_json::{json, Map, Value};

use crate::convert::{HtmlParts, HtmlToPdf, RestToHtml};
use crate::engine::{TemplateEngine, TemplateInput};
use crate::error::{RenderError, RenderResult};

/// Extension marking a part as a template.
pub const TEMPLATE_EXTENSION: &str = ".hbs";

/// How `{{resource}}` addresses a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResourceMode {
    /// A link to the resource route, pinned to the snapshot's commit.
    #[default]
    Url,
    /// The file inlined as a `data:` URI.
    Base64,
}

/// Ties a template engine and two converters together.
#[derive(Clone)]
pub struct Renderer {
    engine: Arc<dyn TemplateEngine>,
    html: Arc<dyn RestToHtml>,
    pdf: Arc<dyn HtmlToPdf>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new(
        engine: Arc<dyn TemplateEngine>,
        html: Arc<dyn RestToHtml>,
        pdf: Arc<dyn HtmlToPdf>,
    ) -> Self {
        Self { engine, html, pdf }
    }

    /// Expand `part` (the handle's default part if `None`) into markup.
    ///
    /// Handles on the archive ref hold already-rendered text, which is
    /// returned as stored. Other handles expand the part as a template;
    /// every `.hbs` file of the snapshot is available as a partial named by
    /// its path without the extension.
    pub fn render_as_text(
        &self,
        doc: &Document,
        part: Option<&str>,
        mode: ResourceMode,
        bindings: &Map<String, Value>,
    ) -> RenderResult<String> {
        if doc.target() == Target::Archive {
            return Ok(doc.read_to_string(doc.default_part())?);
        }
        let part = part.unwrap_or_else(|| doc.default_part());
        let source = doc.read_to_string(part)?;
        let partials = snapshot_partials(doc)?;

        let mut data = bindings.clone();
        data.insert("document".to_string(), document_binding(doc));
        let data = Value::Object(data);

        let resources = |path: &str| -> RenderResult<String> {
            let address = match mode {
                ResourceMode::Url => doc.resource_url(path),
                ResourceMode::Base64 => doc.resource_base64(path),
            };
            address.map_err(|source| RenderError::Resource {
                path: path.to_string(),
                source,
            })
        };

        self.engine.render(&TemplateInput {
            name: part,
            source: &source,
            partials: &partials,
            data: &data,
            resources: &resources,
        })
    }

    /// Expand `part` and convert it to HTML with the document type's
    /// converter settings.
    pub fn render_as_html(
        &self,
        doc: &Document,
        part: Option<&str>,
        mode: ResourceMode,
        bindings: &Map<String, Value>,
    ) -> RenderResult<HtmlParts> {
        let text = self.render_as_text(doc, part, mode, bindings)?;
        self.html.convert(&text, &doc.document_type().settings)
    }

    /// Expand `part` into a self-contained PDF. Resources are always
    /// inlined.
    pub fn render_as_pdf(
        &self,
        doc: &Document,
        part: Option<&str>,
        bindings: &Map<String, Value>,
    ) -> RenderResult<Vec<u8>> {
        let html = self.render_as_html(doc, part, ResourceMode::Base64, bindings)?;
        let pdf = self.pdf.convert(&html.whole)?;
        tracing::info!(
            document = doc.id(),
            version = ?doc.version(),
            bytes = pdf.len(),
            "rendered pdf"
        );
        Ok(pdf)
    }

    /// Render `part` and publish the result on the archive ref, stored under
    /// the part's name without its template extension.
    pub fn archive(
        &self,
        doc: &Document,
        part: Option<&str>,
        meta: &CommitMeta,
    ) -> RenderResult<EditOutcome> {
        let part = part.unwrap_or_else(|| doc.default_part());
        let text = self.render_as_text(doc, Some(part), ResourceMode::Url, &Map::new())?;
        Ok(doc.archive(strip_template_extension(part), text.as_bytes(), meta)?)
    }
}

/// `reports/index.rst.hbs` → `reports/index.rst`. Only the last segment
/// is considered.
pub fn strip_template_extension(part: &str) -> &str {
    let name_start = part.rfind('/').map_or(0, |i| i + 1);
    match part.strip_suffix(TEMPLATE_EXTENSION) {
        Some(stripped) if stripped.len() > name_start => stripped,
        _ => part,
    }
}

fn document_binding(doc: &Document) -> Value {
    json!({
        "type": doc.document_type().name,
        "id": doc.id(),
        "version": doc.version().map(|v| v.to_hex()),
        "author": doc.author(),
        "message": doc.message(),
    })
}

fn snapshot_partials(doc: &Document) -> RenderResult<Vec<(String, String)>> {
    let mut partials = Vec::new();
    let mut pending = vec![String::new()];
    while let Some(dir) = pending.pop() {
        for entry in doc.list(&dir)? {
            let path = if dir.is_empty() {
                entry.name.clone()
            } else {
                format!("{dir}/{}", entry.name)
            };
            if entry.mode == EntryMode::Directory {
                pending.push(path);
            } else if let Some(name) = path.strip_suffix(TEMPLATE_EXTENSION) {
                partials.push((name.to_string(), doc.read_to_string(&path)?));
            }
        }
    }
    Ok(partials)
}
