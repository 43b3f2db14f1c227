// src/error.rs
//! Application error taxonomy and HTTP mapping.
//!
//! Cryptographic and parse failures never bubble raw internals to the
//! caller: a signed code that fails its structure or tag check collapses to
//! a single generic rejection, and store-level failures surface as an opaque
//! 500. Business outcomes (`debe`, `warning`) are not errors at all — they
//! travel in 200 envelopes, see [`crate::models::scan`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Student, trainer, or credential row absent.
    #[error("{0}")]
    NotFound(String),

    /// Signed code failed its structure or tag check. Deliberately one
    /// variant for both: malformed and forged input are indistinguishable
    /// to the caller.
    #[error("{0}")]
    InvalidCredential(String),

    /// Request is syntactically valid but the target is in the wrong state
    /// (e.g. issuing a credential for an inactive student).
    #[error("{0}")]
    InvalidState(String),

    /// Malformed request input (bad timestamp, etc.).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unknown trainer token.
    #[error("{0}")]
    Unauthorized(String),

    /// Known but revoked trainer token.
    #[error("{0}")]
    Forbidden(String),

    /// External store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidCredential(msg)
            | AppError::InvalidState(msg)
            | AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Store(err) => {
                error!("store failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno".to_string(),
                )
            }
        };

        // FastAPI-style body; the existing scanner/dashboard clients read
        // `detail` on error responses.
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
