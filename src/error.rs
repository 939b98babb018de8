//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Setup
//! failures (bad bearer token) surface as HTTP responses on the upgrade
//! request; everything else tears down the streaming session it occurred
//! in. Per-message failures (malformed client JSON) are deliberately not
//! represented here — the request reader logs and discards them locally.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "unauthorized: unknown token",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                |
/// |-----------|-------------------|----------------------------|
/// | 2000–2999 | Authentication    | 401 Unauthorized           |
/// | 3000–3999 | Server/Transport  | 500 Internal Server Error  |
/// | 4000–4999 | Collaborator      | 502 Bad Gateway            |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Bearer token is unknown or has been revoked.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Read or write failure on the WebSocket transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The timeline collaborator failed to answer a query.
    #[error("timeline query failed: {0}")]
    Timeline(String),

    /// Outbound envelope or payload serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Unauthorized(_) => 2001,
            Self::Transport(_) => 3001,
            Self::Serialization(_) => 3002,
            Self::Internal(_) => 3000,
            Self::Timeline(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Transport(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Timeline(_) => StatusCode::BAD_GATEWAY,
        }
    }

}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
