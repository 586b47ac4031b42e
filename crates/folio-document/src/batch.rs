//! Batch updates across several documents.
//!
//! Items addressing the same document are committed together: one tree,
//! one commit, one compare-and-swap. Documents are independent of each
//! other, so one conflict does not stop the rest of the batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::{parse_version, CommitMeta, Context};
use crate::document::EditOutcome;
use crate::error::{DocResult, DocumentError};

/// One part to write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub document_type: String,
    pub document_id: String,
    /// Commit the content was edited against; empty means the current tip.
    #[serde(default)]
    pub version: String,
    pub part: String,
    pub content: String,
}

/// A batch of parts plus optional commit metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub data: Vec<UpdateItem>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
}

impl UpdateRequest {
    /// Commit metadata, with the email folded into the author as
    /// `Name <email>`.
    pub fn commit_meta(&self) -> CommitMeta {
        let author = match (&self.author, &self.author_email) {
            (Some(name), Some(email)) => Some(format!("{name} <{email}>")),
            (Some(name), None) => Some(name.clone()),
            (None, Some(email)) => Some(format!("<{email}>")),
            (None, None) => None,
        };
        CommitMeta {
            author,
            message: self.message.clone(),
        }
    }
}

/// Per-document result of a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    pub document_type: String,
    pub document_id: String,
    #[serde(flatten)]
    pub outcome: EditOutcome,
}

impl Context {
    /// Apply a batch update.
    ///
    /// Items are grouped per `(document_type, document_id)` in order of first
    /// appearance. Each group is edited against the first non-empty version
    /// given for it (or the current tip). A group whose items name two
    /// different versions cannot be satisfied and is reported as a conflict.
    ///
    /// Unknown types, missing documents, malformed versions and invalid part
    /// paths fail the whole batch before any document is written.
    pub fn update_content(&self, request: &UpdateRequest) -> DocResult<Vec<UpdateResult>> {
        let meta = request.commit_meta();
        let mut order: Vec<(String, String)> = Vec::new();
        let mut groups: BTreeMap<(String, String), Vec<&UpdateItem>> = BTreeMap::new();
        for item in &request.data {
            let key = (item.document_type.clone(), item.document_id.clone());
            let group = groups.entry(key.clone()).or_default();
            if group.is_empty() {
                order.push(key);
            }
            group.push(item);
        }

        // Nothing is written until every group resolves.
        let mut planned = Vec::with_capacity(order.len());
        for key in order {
            let items = &groups[&key];
            let mut versions = Vec::new();
            for item in items {
                folio_fs::split_path(&item.part)?;
                if let Some(version) = parse_version(&item.version)? {
                    if !versions.contains(&version) {
                        versions.push(version);
                    }
                }
            }
            let doc = self.open(&key.0, &key.1, versions.first().copied())?;
            if !doc.exists() {
                return Err(DocumentError::NotFound {
                    document_type: key.0,
                    id: key.1,
                });
            }
            planned.push((key, items, versions.len() > 1, doc));
        }

        let mut results = Vec::with_capacity(planned.len());
        for ((document_type, document_id), items, contradictory, doc) in planned {
            let outcome = if contradictory {
                tracing::warn!(%document_type, %document_id, "batch names several versions of one document");
                EditOutcome::Conflict {
                    current: self.resolve(&document_id, doc.target(), None)?,
                }
            } else {
                let changes: Vec<(&str, &[u8])> = items
                    .iter()
                    .map(|item| (item.part.as_str(), item.content.as_bytes()))
                    .collect();
                doc.edit_many(&changes, &meta)?
            };
            results.push(UpdateResult {
                document_type,
                document_id,
                outcome,
            });
        }
        Ok(results)
    }
}
