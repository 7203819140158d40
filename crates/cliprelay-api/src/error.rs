use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use cliprelay_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Durable store unavailable. Never affects the live relay.
    #[error("persistence failure: {0}")]
    Persistence(anyhow::Error),
}

impl ApiError {
    /// Map an axum body rejection to a 400 with a handler-specific summary.
    pub fn invalid_body(summary: &str, rejection: JsonRejection) -> Self {
        warn!("{}: body rejected with {}", summary, rejection.status());
        Self::Validation(summary.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Persistence(e) => {
                error!("Persistence failure: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage unavailable".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
