use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type CrudResult<T> = Result<T, CrudError>;

#[derive(Debug, Error)]
pub enum CrudError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("item has no usable id")]
    MissingId,
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    Conflict(String),
}

impl CrudError {
    /// HTTP status carried by the error, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            CrudError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CrudError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CrudError::Decode(err.to_string())
        } else {
            CrudError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CrudError {
    fn from(err: serde_json::Error) -> Self {
        CrudError::Decode(err.to_string())
    }
}

impl IntoResponse for CrudError {
    fn into_response(self) -> Response {
        let status = match &self {
            CrudError::Unauthorized => StatusCode::UNAUTHORIZED,
            CrudError::NotFound(_) => StatusCode::NOT_FOUND,
            CrudError::Conflict(_) => StatusCode::CONFLICT,
            CrudError::Decode(_) | CrudError::MissingId => StatusCode::BAD_REQUEST,
            CrudError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            CrudError::Transport(_) => StatusCode::BAD_GATEWAY,
            CrudError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(json!({ "status": "error", "message": self.to_string() })),
        )
            .into_response()
    }
}
