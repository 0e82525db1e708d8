use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::ConfigError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InsufficientCredits(String),

    #[error("{0}")]
    StorageFull(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, category, detail) = match self {
            Self::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database", "Database error occurred")
            }
            Self::HttpRequest(ref e) => {
                tracing::error!("HTTP request error: {}", e);
                (StatusCode::BAD_GATEWAY, "upstream", "External service request failed")
            }
            Self::Serialization(ref e) => {
                tracing::error!("Serialization error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization", "Data processing error")
            }
            Self::Io(ref e) => {
                tracing::error!("I/O error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "storage", "File storage error")
            }
            Self::Validation(ref msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation", msg.as_str()),
            Self::NotFound(ref msg) => (StatusCode::NOT_FOUND, "not_found", msg.as_str()),
            Self::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.as_str()),
            Self::InsufficientCredits(ref msg) => {
                (StatusCode::PAYMENT_REQUIRED, "insufficient_credits", msg.as_str())
            }
            Self::StorageFull(ref msg) => (StatusCode::CONFLICT, "storage_full", msg.as_str()),
            Self::InvalidState(ref msg) => (StatusCode::BAD_REQUEST, "invalid_state", msg.as_str()),
            Self::ExternalApi(ref msg) => {
                tracing::error!("External API error: {}", msg);
                (StatusCode::BAD_GATEWAY, "upstream", "Payment service error")
            }
            Self::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg.as_str())
            }
            Self::Other(ref e) => {
                tracing::error!("Unexpected error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", "An unexpected error occurred")
            }
        };

        let body = Json(json!({
            "error": category,
            "detail": detail,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
