//! Error types for the engine client core.
//!
//! # Design
//! `ApiError` is the only error the public surface returns. Every variant
//! carries enough structure for the caller to decide on a retry: nothing in
//! this crate retries or swallows a failure. Transports report failures as
//! `TransportError`; a cancelled transport is promoted to the dedicated
//! `ApiError::Cancelled` kind so callers need not inspect transport details.

use thiserror::Error;

/// Errors returned by dispatch, decoding, and pipeline consumption.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A local value could not be serialized. Never retried.
    #[error("failed to encode payload: {0}")]
    Encoding(String),

    /// The server payload did not match the expected schema.
    #[error("failed to decode response: {0}")]
    Decoding(String),

    /// The server answered with a non-2xx status.
    ///
    /// `message` holds the engine's structured error message when present,
    /// otherwise the raw body text (if any).
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("<no message>"))]
    HttpStatus { status: u16, message: Option<String> },

    /// Connection-level failure reported by the transport.
    #[error("transport failure: {0}")]
    Transport(TransportError),

    /// A stream frame could not be mapped into the endpoint's response type.
    #[error("failed to map stream chunk: {0}")]
    Mapping(String),

    /// The underlying stream was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// The connection base URL, or a URL derived from it, is unusable.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

/// Failures reported by a `Transport` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request never reached the server.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The exchange broke after it started.
    #[error("I/O error: {0}")]
    Io(String),

    /// The stream was closed or cancelled by its owner.
    #[error("stream cancelled")]
    Cancelled,
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Cancelled => ApiError::Cancelled,
            other => ApiError::Transport(other),
        }
    }
}
