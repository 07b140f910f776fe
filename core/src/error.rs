//! Error types for the portal API client.
//!
//! # Design
//! `ApiError` keeps the three-way split of the API layer: the server
//! answered with an error status (`Unauthorized`, `NotFound`, `Http`,
//! `Rejected`), the request went out but nothing came back (`Network`,
//! `Timeout`), or neither (`Unknown` and the serde variants). `ErrorCode` is
//! the flat classification used for logging and user-facing messages.

use std::fmt;

use thiserror::Error;

use crate::http::TransportError;

/// Errors returned by `PortalClient` parse methods and the paginator.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The server returned 401. Stored credentials have been purged.
    #[error("session expired (HTTP 401)")]
    Unauthorized { body: String },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 401 and 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The server answered 2xx but flagged the envelope with `hasError`.
    #[error("request rejected by server: {message}")]
    Rejected { message: String },

    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// No response was received before the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The request could not be issued at all.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Unauthorized { .. } => ErrorCode::Status(401),
            ApiError::NotFound => ErrorCode::Status(404),
            ApiError::Http { status, .. } => ErrorCode::Status(*status),
            ApiError::Network(_) => ErrorCode::Network,
            ApiError::Timeout => ErrorCode::Timeout,
            ApiError::Rejected { .. }
            | ApiError::Deserialization(_)
            | ApiError::Serialization(_)
            | ApiError::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// Raw server payload or low-level cause, when there is one.
    pub fn details(&self) -> Option<String> {
        match self {
            ApiError::Unauthorized { body } | ApiError::Http { body, .. } if !body.is_empty() => {
                Some(body.clone())
            }
            ApiError::Network(msg)
            | ApiError::Deserialization(msg)
            | ApiError::Serialization(msg)
            | ApiError::Unknown(msg) => Some(msg.clone()),
            ApiError::Rejected { message } => Some(message.clone()),
            _ => None,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => ApiError::Timeout,
            TransportError::Connect(msg) => ApiError::Network(msg),
            TransportError::Other(msg) => ApiError::Unknown(msg),
        }
    }
}

/// Flat error classification shared by logging, messages and retry hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Network,
    Timeout,
    Status(u16),
    Unknown,
}

impl ErrorCode {
    /// Parse the string form produced by `Display`.
    pub fn parse(code: &str) -> Self {
        match code {
            "NETWORK_ERROR" => ErrorCode::Network,
            "TIMEOUT" => ErrorCode::Timeout,
            other => other
                .parse::<u16>()
                .map(ErrorCode::Status)
                .unwrap_or(ErrorCode::Unknown),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Network => f.write_str("NETWORK_ERROR"),
            ErrorCode::Timeout => f.write_str("TIMEOUT"),
            ErrorCode::Status(status) => write!(f, "{status}"),
            ErrorCode::Unknown => f.write_str("UNKNOWN_ERROR"),
        }
    }
}
