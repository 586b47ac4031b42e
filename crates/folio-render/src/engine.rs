//! Template expansion.
//!
//! The pipeline only needs "render this source with these bindings"; the
//! [`TemplateEngine`] trait is that seam, and [`HandlebarsEngine`] is the
//! shipped implementation.

use handlebars::{
    Context as HbContext, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    RenderErrorReason,
};
use serde_json::Value;

use crate::error::RenderResult;

/// Maps a resource path inside a document to the string a template embeds
/// (a URL or an inline `data:` URI).
pub trait Resources: Sync {
    fn address(&self, path: &str) -> RenderResult<String>;
}

impl<F> Resources for F
where
    F: Fn(&str) -> RenderResult<String> + Sync,
{
    fn address(&self, path: &str) -> RenderResult<String> {
        self(path)
    }
}

/// Everything needed to expand one template.
pub struct TemplateInput<'a> {
    /// Name used in error messages.
    pub name: &'a str,
    pub source: &'a str,
    /// `(name, source)` pairs available as `{{> name}}`.
    pub partials: &'a [(String, String)],
    pub data: &'a Value,
    pub resources: &'a dyn Resources,
}

/// Renders a template source with bindings.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, input: &TemplateInput<'_>) -> RenderResult<String>;
}

/// Handlebars-backed [`TemplateEngine`].
///
/// Output is markup, not HTML, so nothing is escaped. Templates can call
/// `{{resource "images/logo.png"}}` to embed a resource address.
#[derive(Clone, Debug, Default)]
pub struct HandlebarsEngine {
    strict: bool,
}

impl HandlebarsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on references to missing bindings instead of rendering nothing.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, input: &TemplateInput<'_>) -> RenderResult<String> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(self.strict);
        registry.register_helper(
            "resource",
            Box::new(ResourceHelper {
                resources: input.resources,
            }),
        );
        for (name, source) in input.partials {
            registry.register_partial(name, source)?;
        }
        let text = registry.render_template(input.source, input.data)?;
        tracing::debug!(template = input.name, bytes = text.len(), "expanded template");
        Ok(text)
    }
}

struct ResourceHelper<'a> {
    resources: &'a dyn Resources,
}

impl HelperDef for ResourceHelper<'_> {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc HbContext,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let path = h
            .param(0)
            .and_then(|p| p.value().as_str())
            .ok_or_else(|| {
                RenderErrorReason::Other("resource helper needs a path argument".to_string())
            })?;
        let address = self
            .resources
            .address(path)
            .map_err(|e| RenderErrorReason::Other(e.to_string()))?;
        out.write(&address)?;
        Ok(())
    }
}
