//! # Error Handling
//!
//! Defines the gateway's error type and how each variant becomes an HTTP
//! response for the widget.
//!
//! ## Error Sources:
//! - **Audio pipeline**: `AudioError` from capture, decoding, resampling, encoding
//! - **Remote chatbot API**: network failures and unusable responses
//! - **Requests**: malformed JSON or multipart bodies
//! - **Configuration**: invalid runtime updates
//!
//! ## JSON Response Format:
//! ```json
//! {
//!   "error": {
//!     "type": "upstream_error",
//!     "message": "Transcription service returned no text",
//!     "timestamp": "2025-01-01T12:00:00Z"
//!   }
//! }
//! ```

use crate::audio::AudioError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Errors returned by gateway handlers.
///
/// ## Status Mapping:
/// - **Internal / ConfigError** → 500
/// - **BadRequest / ValidationError** → 400
/// - **NotFound** → 404
/// - **Upstream** → 502
#[derive(Debug)]
pub enum AppError {
    /// Unexpected failures inside the gateway
    Internal(String),

    /// The request body could not be understood
    BadRequest(String),

    /// Requested resource was not found
    NotFound(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// The request was understood but its content is unusable
    ValidationError(String),

    /// The remote chatbot API failed or answered with something unusable
    Upstream(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = self.parts();

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// Audio failures are the caller's fault unless the gateway itself broke.
///
/// An empty, aborted, oversized, or undecodable recording is a 400; the
/// resampler and encoder only fail on arguments the gateway chose, so
/// `InvalidArgument` is a 500.
impl From<AudioError> for AppError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::InvalidArgument(_) => AppError::Internal(err.to_string()),
            AudioError::UnsupportedFormat(_)
            | AudioError::Decode(_)
            | AudioError::EmptyRecording
            | AudioError::CaptureAborted
            | AudioError::RecordingTooLarge { .. } => AppError::ValidationError(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors come from request bodies, so they are a 400.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Any transport or decoding failure talking to the remote API is a 502.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Upstream(format!("Chatbot API timed out: {}", err))
        } else {
            AppError::Upstream(format!("Chatbot API request failed: {}", err))
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(format!("Audio worker unavailable: {}", err))
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
