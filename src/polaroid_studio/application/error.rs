use thiserror::Error;
use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;

/// Message returned to callers for every server-side failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "An internal server error occurred or all keys failed.";

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Invalid request: {0}")]
    DomainError(#[from] DomainError),

    #[error("No upstream API keys are configured")]
    ConfigurationMissing,

    #[error("Upstream rejected the request with status {status}")]
    UpstreamHardFailure { status: u16 },

    #[error("All upstream API keys are rate-limited or unreachable")]
    AllKeysExhausted,

    #[error("A caption request is already in flight")]
    CaptionInFlight,

    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Infrastructure error occurred: {0}")]
    InfrastructureError(#[from] InfrastructureError),
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApplicationError::DomainError(domain_err) => {
                tracing::info!("Rejected caption request: {}", domain_err);
                (StatusCode::BAD_REQUEST, domain_err.to_string())
            }
            // 上流のエラー内容はクライアントに返さない
            other => {
                tracing::error!("Caption request failed: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE_MESSAGE.to_string())
            }
        };
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
