//! Explicit registry of document types.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DocResult, DocumentError};
use crate::id_template::{self, Bindings};

/// Default template part edited and rendered for live documents.
pub const DEFAULT_EDIT_PART: &str = "index.rst.hbs";

/// Part that holds the rendered text in archive snapshots.
pub const DEFAULT_ARCHIVE_PART: &str = "index.rst";

/// Configuration of one kind of document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    /// Registry key, also the `<type>` segment of resource routes.
    pub name: String,
    /// Directory copied into every new document as its first snapshot.
    pub model: PathBuf,
    /// Optional template computing ids from bindings, e.g. `"employee-{person_id}"`.
    #[serde(default)]
    pub id_template: Option<String>,
    /// Per-type overrides passed to the markup converters.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    /// Part edited and rendered by default.
    #[serde(default = "default_edit_part")]
    pub edit_part: String,
    /// Part read from archive snapshots.
    #[serde(default = "default_archive_part")]
    pub archive_part: String,
}

fn default_edit_part() -> String {
    DEFAULT_EDIT_PART.to_string()
}

fn default_archive_part() -> String {
    DEFAULT_ARCHIVE_PART.to_string()
}

impl DocumentType {
    /// A document type seeded from the `model` directory.
    pub fn new(name: impl Into<String>, model: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            id_template: None,
            settings: BTreeMap::new(),
            edit_part: default_edit_part(),
            archive_part: default_archive_part(),
        }
    }

    pub fn with_id_template(mut self, template: impl Into<String>) -> Self {
        self.id_template = Some(template.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_edit_part(mut self, part: impl Into<String>) -> Self {
        self.edit_part = part.into();
        self
    }

    /// Compute a document id from the type's id template.
    ///
    /// Without a template, the binding `id` is used as-is.
    pub fn document_id(&self, bindings: &Bindings) -> DocResult<String> {
        match &self.id_template {
            Some(template) => id_template::expand(template, bindings),
            None => bindings
                .get("id")
                .cloned()
                .ok_or_else(|| DocumentError::MissingBinding {
                    template: "{id}".to_string(),
                    name: "id".to_string(),
                }),
        }
    }
}

fn validate_type_name(name: &str) -> DocResult<()> {
    let invalid = |reason: &str| DocumentError::InvalidTypeName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid("only ASCII letters, digits, '_' and '-' are allowed"));
    }
    Ok(())
}

/// Mapping from type name to [`DocumentType`], filled at startup.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    types: BTreeMap<String, Arc<DocumentType>>,
    model_root: Option<PathBuf>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative model paths against `root`.
    pub fn with_model_root(root: impl Into<PathBuf>) -> Self {
        Self {
            types: BTreeMap::new(),
            model_root: Some(root.into()),
        }
    }

    pub fn model_root(&self) -> Option<&Path> {
        self.model_root.as_deref()
    }

    /// Add a document type. Names must be unique.
    pub fn register(&mut self, mut doc_type: DocumentType) -> DocResult<Arc<DocumentType>> {
        validate_type_name(&doc_type.name)?;
        if self.types.contains_key(&doc_type.name) {
            return Err(DocumentError::DuplicateType(doc_type.name));
        }
        if let Some(template) = &doc_type.id_template {
            id_template::placeholders(template)?;
        }
        if let Some(root) = &self.model_root {
            if doc_type.model.is_relative() {
                doc_type.model = root.join(&doc_type.model);
            }
        }
        tracing::debug!(name = %doc_type.name, model = %doc_type.model.display(), "registered document type");
        let doc_type = Arc::new(doc_type);
        self.types
            .insert(doc_type.name.clone(), Arc::clone(&doc_type));
        Ok(doc_type)
    }

    /// Look up a document type by name.
    pub fn get(&self, name: &str) -> DocResult<Arc<DocumentType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| DocumentError::UnknownType(name.to_string()))
    }

    /// All registered types, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DocumentType>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
