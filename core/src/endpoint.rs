//! The contract every engine operation implements.
//!
//! # Design
//! An endpoint is an immutable value built per call. Its body and response
//! types are bound at definition time through associated types, so the
//! dispatcher encodes and decodes without any runtime type erasure.
//! Construction never fails; problems surface during encoding or dispatch.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::HttpMethod;

/// A single engine API operation.
pub trait Endpoint {
    /// Request payload type. Use `NoBody` for body-less operations.
    type Body: Serialize;

    /// Declared response type. Use `NoBody` for structurally empty responses.
    type Response: DeserializeOwned;

    /// Path relative to the version prefix, with identifiers interpolated.
    fn path(&self) -> String;

    fn method(&self) -> HttpMethod;

    fn body(&self) -> Option<&Self::Body> {
        None
    }

    /// Query parameters appended to the URL.
    fn query(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// An endpoint whose response is read incrementally from an open stream.
pub trait PipelineEndpoint: Endpoint {
    /// Maps one newline-delimited frame into a response value.
    fn map_chunk(&self, raw: &str) -> Result<Self::Response, ApiError> {
        serde_json::from_str(raw).map_err(|e| ApiError::Mapping(e.to_string()))
    }

    /// Whether `response` ends the stream. Wait-style endpoints stop after
    /// the first qualifying status even if the server keeps the body open.
    fn is_terminal(&self, _response: &Self::Response) -> bool {
        false
    }
}
