use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error taxonomy. Every handler converts internal failures into one of
/// these at its boundary; nothing else crosses into the transport layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),
    /// Duplicate account.
    #[error("{0}")]
    Conflict(String),
    /// Bad credentials, token or expired code. Messages stay generic so the
    /// response never distinguishes "no such user" from "wrong password".
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    NotFound(String),
    /// Store or notification failure surfaced with the underlying message.
    #[error("{0}")]
    Operation(#[from] anyhow::Error),
    /// Downstream failure on operations that report 500.
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = ErrorEnvelope {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized() -> Self {
        Self::Authentication("Unauthorized".into())
    }
}
