use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use folio_document::{
    parse_version, Context, Document, Target, UpdateRequest, UpdateResult,
};
use folio_store::TreeEntry;
use folio_types::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Shared state of every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub ctx: Context,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(ctx: Context, config: ServerConfig) -> Self {
        Self {
            ctx,
            config: Arc::new(config),
        }
    }
}

/// Run repository work off the async workers.
async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Metadata of one resolved document commit.
#[derive(Clone, Debug, Serialize)]
pub struct DocumentSummary {
    pub document_type: String,
    pub document_id: String,
    pub version: Option<ObjectId>,
    pub author: Option<String>,
    pub message: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            document_type: doc.document_type().name.clone(),
            document_id: doc.id().to_string(),
            version: doc.version(),
            author: doc.author().map(str::to_string),
            message: doc.message().map(str::to_string),
            datetime: doc.datetime(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    pub entries: Vec<TreeEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PartContent {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    pub part: String,
    pub content: String,
}

/// `?version=<hex>&archive=true`; both optional.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SnapshotQuery {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub archive: bool,
}

impl SnapshotQuery {
    fn target(&self) -> Target {
        if self.archive {
            Target::Archive
        } else {
            Target::Live
        }
    }
}

fn open_existing(
    ctx: &Context,
    doc_type: &str,
    id: &str,
    target: Target,
    version: Option<ObjectId>,
) -> ServerResult<Document> {
    let doc = ctx.open_target(doc_type, id, target, version)?;
    if !doc.exists() {
        return Err(ServerError::NotFound(format!("{doc_type}/{id}")));
    }
    Ok(doc)
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let types: Vec<&str> = state
        .ctx
        .registry()
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    Json(json!({
        "name": "folio-server",
        "version": env!("CARGO_PKG_VERSION"),
        "document_types": types,
        "resource_prefix": state.ctx.resource_prefix(),
    }))
}

/// Ids of every live document.
pub async fn list_handler(State(state): State<AppState>) -> ServerResult<Json<serde_json::Value>> {
    let ids = blocking(move || Ok(state.ctx.document_ids()?)).await?;
    Ok(Json(json!({ "documents": ids })))
}

/// Metadata and top-level entries of a document snapshot.
pub async fn document_handler(
    State(state): State<AppState>,
    Path((doc_type, id)): Path<(String, String)>,
    Query(query): Query<SnapshotQuery>,
) -> ServerResult<Json<DocumentDetail>> {
    let detail = blocking(move || {
        let version = parse_version(&query.version)?;
        let doc = open_existing(&state.ctx, &doc_type, &id, query.target(), version)?;
        Ok(DocumentDetail {
            summary: DocumentSummary::from(&doc),
            entries: doc.list("")?,
        })
    })
    .await?;
    Ok(Json(detail))
}

/// Commits of the live or archive ref, newest first.
pub async fn history_handler(
    State(state): State<AppState>,
    Path((doc_type, id)): Path<(String, String)>,
    Query(query): Query<SnapshotQuery>,
) -> ServerResult<Json<Vec<DocumentSummary>>> {
    let history = blocking(move || {
        let doc = state.ctx.open_target(&doc_type, &id, query.target(), None)?;
        let mut entries = Vec::new();
        for handle in doc.history()? {
            entries.push(DocumentSummary::from(&handle?));
        }
        Ok(entries)
    })
    .await?;
    Ok(Json(history))
}

/// One part of a document snapshot as text.
pub async fn part_handler(
    State(state): State<AppState>,
    Path((doc_type, id, part)): Path<(String, String, String)>,
    Query(query): Query<SnapshotQuery>,
) -> ServerResult<Json<PartContent>> {
    let content = blocking(move || {
        let version = parse_version(&query.version)?;
        let doc = open_existing(&state.ctx, &doc_type, &id, query.target(), version)?;
        let part = part.trim_start_matches('/').to_string();
        let content = doc.read_to_string(&part)?;
        Ok(PartContent {
            summary: DocumentSummary::from(&doc),
            part,
            content,
        })
    })
    .await?;
    Ok(Json(content))
}

/// Apply a batch update; conflicts are reported per document.
pub async fn update_handler(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> ServerResult<Json<Vec<UpdateResult>>> {
    if request.data.is_empty() {
        return Err(ServerError::BadRequest("no items to update".to_string()));
    }
    let results = blocking(move || Ok(state.ctx.update_content(&request)?)).await?;
    Ok(Json(results))
}

/// Serve a file from the exact commit named in the URL.
pub async fn resource_handler(
    State(state): State<AppState>,
    Path((doc_type, id, version, path)): Path<(String, String, String, String)>,
) -> ServerResult<Response> {
    let limit = state.config.max_resource_size;
    let path = path.trim_start_matches('/').to_string();
    let (data, mime) = blocking(move || {
        let version = parse_version(&version)?
            .ok_or_else(|| ServerError::BadRequest("missing version".to_string()))?;
        let doc = open_existing(&state.ctx, &doc_type, &id, Target::Live, Some(version))?;
        let size = doc.size(&path)?;
        if size > limit {
            return Err(ServerError::TooLarge { size, limit });
        }
        let data = doc.read(&path)?;
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        Ok((data, mime))
    })
    .await?;
    Ok(([(header::CONTENT_TYPE, mime.essence_str().to_string())], data).into_response())
}
