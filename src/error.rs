use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::{commitment::CommitmentErrorCode, common::ErrorResponse};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Invalid IAP receipt: {0}")]
    InvalidReceipt(String),

    #[error("Commitment rejected ({0}): {1}")]
    CommitmentRejected(CommitmentErrorCode, String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn rejected(code: CommitmentErrorCode, message: impl Into<String>) -> Self {
        Self::CommitmentRejected(code, message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Server-side failures are reported to Sentry before being masked
        if matches!(
            self,
            ApiError::Database(_) | ApiError::Upstream(_) | ApiError::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = ?self, sentry_event_id = %event_id, "Request failed");
        }

        let (status, error_code, message) = match self {
            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR".to_string(),
                "An internal database error occurred".to_string(),
            ),
            ApiError::InvalidReceipt(ref msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_RECEIPT".to_string(),
                msg.clone(),
            ),
            ApiError::CommitmentRejected(code, ref msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                code.as_str().to_string(),
                msg.clone(),
            ),
            ApiError::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST".to_string(), msg.clone())
            }
            ApiError::NotFound(ref msg) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND".to_string(), msg.clone())
            }
            ApiError::Unauthorized(ref msg) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED".to_string(),
                msg.clone(),
            ),
            ApiError::InvalidToken(ref msg) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN".to_string(),
                msg.clone(),
            ),
            ApiError::ExpiredToken => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED".to_string(),
                "Access token has expired".to_string(),
            ),
            ApiError::Forbidden(ref msg) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN".to_string(), msg.clone())
            }
            ApiError::Conflict(ref msg) => {
                (StatusCode::CONFLICT, "CONFLICT".to_string(), msg.clone())
            }
            ApiError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR".to_string(),
                "Receipt verification is temporarily unavailable".to_string(),
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "An internal error occurred".to_string(),
            ),
        };

        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ApiError>;
