use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors the HTTP layer reports to clients.
///
/// Tool problems are not in here: they degrade into simulated responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing messages array")]
    MissingMessages,

    #[error("Empty messages array")]
    EmptyMessages,

    #[error("Invalid message at index {index}: {reason}")]
    InvalidMessage { index: usize, reason: String },

    #[error("Invalid JSON body")]
    InvalidBody(String),

    /// The bridge could not serialize its own response. `raw` carries the
    /// tool output that was being returned, if any.
    #[error("Failed to serialize completion response")]
    Serialization { details: String, raw: String },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingMessages
            | Self::EmptyMessages
            | Self::InvalidMessage { .. }
            | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::InvalidBody(details) => json!({ "error": self.to_string(), "details": details }),
            Self::Serialization { details, raw } => {
                tracing::error!(error = %details, "Failed to serialize completion response");
                json!({ "error": self.to_string(), "details": details, "raw": raw })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Why a single tool invocation produced no usable output.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect tool output: {0}")]
    Io(#[from] std::io::Error),

    #[error("tool did not finish within {0:?}")]
    Timeout(Duration),
}
