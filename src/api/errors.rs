use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::broker::BrokerError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed client input.
    #[error("{0}")]
    BadRequest(String),
    /// Storage or other server-side failure; `message` is safe to show callers.
    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to publish MQTT command.")]
    Publish(#[from] BrokerError),
}

impl ApiError {
    /// `map_err` adapter that attaches a caller-facing message to a failure.
    pub fn internal(message: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Internal { message, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message }),
            ),
            ApiError::Internal { message, source } => {
                error!(error = %format!("{source:#}"), "{message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": message, "error": source.to_string() }),
                )
            }
            ApiError::Publish(e) => {
                let status = match e {
                    BrokerError::Disconnected => StatusCode::SERVICE_UNAVAILABLE,
                    BrokerError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (
                    status,
                    json!({ "success": false, "message": self.to_string(), "error": e.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
