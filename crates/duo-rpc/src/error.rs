//! Maps core errors onto HTTP responses (§10.3).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use duo_core::DuoError;
use serde_json::json;

/// The adapter-facing error type. Wraps `DuoError` for the status mapping
/// below and carries a handful of request-shape errors of its own.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] DuoError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Core(e) => match e {
                DuoError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                DuoError::CrossChainMismatch { .. } => (StatusCode::CONFLICT, "cross_chain_mismatch"),
                DuoError::RebuildFailed { .. } => (StatusCode::CONFLICT, "rebuild_failed"),
                DuoError::InvariantViolation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation"),
                DuoError::TypeMismatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "type_mismatch"),
                DuoError::IoError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
                DuoError::HashMismatch { .. } => (StatusCode::BAD_REQUEST, "hash_mismatch"),
                DuoError::LinkMismatch { .. } => (StatusCode::BAD_REQUEST, "link_mismatch"),
            },
        };
        let body = Json(json!({
            "error": { "code": code, "message": self.to_string() },
        }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
