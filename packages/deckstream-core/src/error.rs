//! Centralized error types for the deckstream core library.
//!
//! Concern-specific errors (`TrackLookupError`, `NetworkError`,
//! `TransportError`) live beside the code that raises them and implement
//! [`ErrorCode`]. The admin API converts them into [`DeckstreamError`],
//! which renders as a JSON `{error, message, status}` response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::events::TransportError;
use crate::prolink::{NetworkError, TrackLookupError};

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for TrackLookupError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "track_not_found",
            Self::Unavailable(_) => "track_database_unavailable",
        }
    }
}

impl ErrorCode for NetworkError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownInterface(_) => "unknown_interface",
            Self::InterfaceList(_) => "interface_list_failed",
            Self::AutoConfigure(_) => "auto_configure_failed",
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Closed => "connection_closed",
            Self::QueueFull => "outbound_queue_full",
        }
    }
}

/// Application-wide error type for the admin API.
#[derive(Debug, Error)]
pub enum DeckstreamError {
    /// No track exists for the requested key.
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// The track database could not be queried.
    #[error("Track lookup failed: {0}")]
    TrackLookup(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network configuration was rejected or failed.
    #[error("Network error: {message}")]
    Network {
        code: &'static str,
        message: String,
    },

    /// Server configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeckstreamError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TrackNotFound(_) => "track_not_found",
            Self::TrackLookup(_) => "track_lookup_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Network { code, .. } => *code,
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TrackNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) | Self::Configuration(_) => StatusCode::BAD_REQUEST,
            Self::TrackLookup(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Network { code, .. } if *code == "unknown_interface" => StatusCode::BAD_REQUEST,
            Self::Network { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type DeckstreamResult<T> = Result<T, DeckstreamError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for DeckstreamError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TrackLookupError> for DeckstreamError {
    fn from(err: TrackLookupError) -> Self {
        match err {
            TrackLookupError::NotFound(_) => Self::TrackNotFound(err.to_string()),
            TrackLookupError::Unavailable(_) => Self::TrackLookup(err.to_string()),
        }
    }
}

impl From<NetworkError> for DeckstreamError {
    fn from(err: NetworkError) -> Self {
        Self::Network {
            code: err.code(),
            message: err.to_string(),
        }
    }
}
