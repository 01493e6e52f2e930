// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, malformed, expired or forged session token, or unknown user.
    #[error("Authentication required")]
    Unauthorized,

    /// Session is valid but the linked Medium token is absent or stale.
    #[error("Medium account must be reconnected")]
    MediumReauthRequired,

    #[error("Medium OAuth exchange failed: {0}")]
    OAuthExchangeFailed(String),

    /// Medium refused the post (validation error). Not retryable as-is.
    #[error("Medium rejected the post: {0}")]
    PublishRejected(String),

    /// Network failure, timeout, rate limit or outage on the Medium side.
    #[error("Medium is unavailable: {0}")]
    PublishUnavailable(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::MediumReauthRequired => (
                StatusCode::FORBIDDEN,
                "medium_reauth_required",
                Some("Reconnect your Medium account".to_string()),
            ),
            AppError::OAuthExchangeFailed(msg) => {
                tracing::warn!(error = %msg, "Medium OAuth exchange failed");
                (StatusCode::BAD_GATEWAY, "oauth_exchange_failed", None)
            }
            AppError::PublishRejected(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "publish_rejected",
                Some(msg.clone()),
            ),
            AppError::PublishUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "publish_unavailable",
                Some(msg.clone()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", None),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
