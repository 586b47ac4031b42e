use folio_document::DocumentError;

/// Errors from the rendering pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Template parsing or expansion failed.
    #[error("template error: {0}")]
    Template(String),

    /// A `{{resource}}` lookup failed.
    #[error("resource {path:?}: {source}")]
    Resource {
        path: String,
        #[source]
        source: DocumentError,
    },

    /// An external converter could not be run or reported failure.
    #[error("converter {program} failed: {reason}")]
    Converter { program: String, reason: String },

    /// A converter command line with no program.
    #[error("empty converter command")]
    EmptyCommand,

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<handlebars::RenderError> for RenderError {
    fn from(e: handlebars::RenderError) -> Self {
        Self::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for RenderError {
    fn from(e: handlebars::TemplateError) -> Self {
        Self::Template(e.to_string())
    }
}

/// Result alias for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
