use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use folio_document::{DocumentType, Registry, DEFAULT_AUTHOR};
use folio_render::{CommandConverter, HandlebarsEngine, Renderer};
use folio_server::ServerConfig;
use serde::{Deserialize, Serialize};

/// External converter command lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub rest_to_html: Vec<String>,
    pub html_to_pdf: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            rest_to_html: vec!["rst2html5".to_string()],
            html_to_pdf: vec!["weasyprint".to_string(), "-".to_string(), "-".to_string()],
        }
    }
}

/// Contents of `folio.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Repository directory.
    pub repository: PathBuf,
    pub default_author: String,
    /// Directory that relative model paths are resolved against.
    pub model_root: PathBuf,
    /// Renders `{{name}}` placeholders with no binding as errors.
    pub strict_templates: bool,
    pub server: ServerConfig,
    pub converters: ConverterConfig,
    pub document_types: Vec<DocumentType>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            repository: PathBuf::from("documents"),
            default_author: DEFAULT_AUTHOR.to_string(),
            model_root: PathBuf::from("."),
            strict_templates: false,
            server: ServerConfig::default(),
            converters: ConverterConfig::default(),
            document_types: Vec::new(),
        }
    }
}

impl FolioConfig {
    /// Load a configuration file. Relative paths in it are taken relative
    /// to the file's directory. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config: Self =
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.repository = base.join(&config.repository);
            config.model_root = base.join(&config.model_root);
        }
        Ok(config)
    }

    pub fn registry(&self) -> anyhow::Result<Registry> {
        let mut registry = Registry::with_model_root(&self.model_root);
        for doc_type in &self.document_types {
            registry
                .register(doc_type.clone())
                .with_context(|| format!("registering document type {}", doc_type.name))?;
        }
        Ok(registry)
    }

    pub fn renderer(&self) -> anyhow::Result<Renderer> {
        let html = CommandConverter::from_argv(&self.converters.rest_to_html)
            .context("converters.rest_to_html")?;
        let pdf = CommandConverter::from_argv(&self.converters.html_to_pdf)
            .context("converters.html_to_pdf")?;
        Ok(Renderer::new(
            Arc::new(HandlebarsEngine::new().strict(self.strict_templates)),
            Arc::new(html),
            Arc::new(pdf),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
repository = "data/documents"
default_author = "HR <hr@example.org>"
model_root = "models"

[server]
bind_addr = "0.0.0.0:9000"

[converters]
html_to_pdf = ["wkhtmltopdf", "-", "-"]

[[document_types]]
name = "EmployeeDoc"
model = "employee"
id_template = "employee-{person_id}"

[document_types.settings]
stylesheet = "report.css"
"#;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FolioConfig::load(&dir.path().join("folio.toml")).unwrap();
        assert_eq!(config, FolioConfig::default());
    }

    #[test]
    fn loads_and_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = FolioConfig::load(&path).unwrap();

        assert_eq!(config.repository, dir.path().join("data/documents"));
        assert_eq!(config.model_root, dir.path().join("models"));
        assert_eq!(config.default_author, "HR <hr@example.org>");
        assert_eq!(config.server.bind_addr.port(), 9000);
        assert_eq!(
            config.server.max_resource_size,
            ServerConfig::default().max_resource_size
        );
        assert_eq!(config.converters.rest_to_html, ["rst2html5"]);
        assert_eq!(config.converters.html_to_pdf[0], "wkhtmltopdf");

        let doc_type = &config.document_types[0];
        assert_eq!(doc_type.id_template.as_deref(), Some("employee-{person_id}"));
        assert_eq!(doc_type.settings["stylesheet"], "report.css");
        assert_eq!(doc_type.edit_part, "index.rst.hbs");

        let registry = config.registry().unwrap();
        assert_eq!(
            registry.get("EmployeeDoc").unwrap().model,
            dir.path().join("models/employee")
        );
    }

    #[test]
    fn rejects_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, "repository = [").unwrap();
        assert!(FolioConfig::load(&path).is_err());
    }

    #[test]
    fn empty_converter_command_is_an_error() {
        let config = FolioConfig {
            converters: ConverterConfig {
                rest_to_html: Vec::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.renderer().is_err());
    }
}
