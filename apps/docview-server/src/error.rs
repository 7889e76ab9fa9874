//! Error types for the DocView server

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::documents::DocumentError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Document(e) => match e {
                DocumentError::InvalidName(name) => (
                    StatusCode::BAD_REQUEST,
                    "invalid_document",
                    format!("Invalid document name: {}", name),
                ),
                DocumentError::NotFound(name) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("Document not found: {}", name),
                ),
                DocumentError::Io(io) => {
                    tracing::warn!("Document unreadable: {}", io);
                    (
                        StatusCode::FORBIDDEN,
                        "document_unreadable",
                        "Document could not be read".to_string(),
                    )
                }
            },
            AppError::Backend(e) => match e {
                // Backend failures pass through untouched
                BackendError::Rejected {
                    status,
                    content_type,
                    body,
                } => {
                    tracing::warn!(status = %status, "Backend rejected request");
                    let mut response = Response::new(Body::from(body.clone()));
                    *response.status_mut() = *status;
                    if let Some(content_type) = content_type {
                        response
                            .headers_mut()
                            .insert(header::CONTENT_TYPE, content_type.clone());
                    }
                    return response;
                }
                BackendError::Timeout(msg) => {
                    tracing::error!("Backend timeout: {}", msg);
                    (
                        StatusCode::GATEWAY_TIMEOUT,
                        "backend_timeout",
                        "The document service did not respond in time".to_string(),
                    )
                }
                BackendError::Unreachable(msg) => {
                    tracing::error!("Backend unreachable: {}", msg);
                    (
                        StatusCode::BAD_GATEWAY,
                        "backend_unavailable",
                        "The document service is unavailable".to_string(),
                    )
                }
                BackendError::InvalidResponse(msg) => {
                    tracing::error!("Invalid backend response: {}", msg);
                    (
                        StatusCode::BAD_GATEWAY,
                        "backend_invalid_response",
                        "The document service returned an unexpected response".to_string(),
                    )
                }
                BackendError::Source(_) | BackendError::Config(_) => {
                    tracing::error!("Backend error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
