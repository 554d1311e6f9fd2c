//! Error types for the todo API client.
//!
//! # Design
//! Three kinds of failure matter to the UI: the request never completed or the
//! server failed (`Request`/`Http`), the id does not exist (`NotFound`), or the
//! server rejected the payload (`Validation`). Codec failures are kept apart
//! for debugging but are treated like request failures by callers.
//!
//! Errors are `Clone` so a single failed request can be handed to every caller
//! that was coalesced onto it.

use thiserror::Error;

/// Errors returned by `TodoClient` parse methods and by transports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request did not complete (connection refused, timeout, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The server returned 404; the referenced todo does not exist.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The server returned 400 or 422; the payload was rejected.
    #[error("validation failed: {message}")]
    Validation { status: u16, message: String },

    /// The server returned any other non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Coarse classification surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Request,
    NotFound,
    Validation,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Request(_)
            | ApiError::Http { .. }
            | ApiError::Deserialization(_)
            | ApiError::Serialization(_) => ErrorKind::Request,
        }
    }

    /// Human-readable text for display next to the failing control.
    pub fn message(&self) -> &str {
        match self {
            ApiError::NotFound { message }
            | ApiError::Validation { message, .. }
            | ApiError::Http { message, .. } => message,
            ApiError::Request(msg) | ApiError::Deserialization(msg) | ApiError::Serialization(msg) => msg,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(ApiError::Request("refused".into()).kind(), ErrorKind::Request);
        assert_eq!(
            ApiError::NotFound { message: "gone".into() }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ApiError::Validation { status: 422, message: "title is required".into() }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ApiError::Http { status: 500, message: "boom".into() }.kind(),
            ErrorKind::Request
        );
        assert_eq!(ApiError::Deserialization("eof".into()).kind(), ErrorKind::Request);
    }

    #[test]
    fn message_is_the_server_text() {
        let err = ApiError::Validation { status: 400, message: "title is required".into() };
        assert_eq!(err.message(), "title is required");
        assert_eq!(err.to_string(), "validation failed: title is required");
    }
}
