use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use folio_document::DocumentError;
use folio_fs::FsError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("resource of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Document(e) if e.is_fatal() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Document(e) => document_status(e),
            Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn document_status(e: &DocumentError) -> StatusCode {
    match e {
        DocumentError::UnknownType(_)
        | DocumentError::NotFound { .. }
        | DocumentError::InvalidVersion { .. }
        | DocumentError::PathNotFound(_) => StatusCode::NOT_FOUND,
        DocumentError::InvalidId { .. }
        | DocumentError::MissingBinding { .. }
        | DocumentError::MalformedTemplate { .. } => StatusCode::BAD_REQUEST,
        DocumentError::Fs(FsError::InvalidPath { .. }) => StatusCode::BAD_REQUEST,
        DocumentError::Fs(FsError::NotAFile(_) | FsError::NotADirectory(_)) => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
