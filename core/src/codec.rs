//! JSON body codec.
//!
//! Absence is modelled as JSON `null`: any value that serializes to `null`
//! (`NoBody`, `None`, `()`) encodes to an empty payload, and an empty payload
//! decodes as `null`. Generic dispatch code therefore never special-cases
//! body-less endpoints or structurally empty responses.

use serde::de::{DeserializeOwned, Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// The absent body.
///
/// Encodes to zero bytes and decodes from anything, including zero bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NoBody;

impl<'de> Deserialize<'de> for NoBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| NoBody)
    }
}

/// Serialize `value` to a JSON payload. Values that serialize to `null`
/// produce an empty payload.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ApiError> {
    let bytes = serde_json::to_vec(value).map_err(|e| ApiError::Encoding(e.to_string()))?;
    if bytes == b"null" {
        return Ok(Vec::new());
    }
    Ok(bytes)
}

/// Deserialize a JSON payload. An empty or whitespace-only payload is read
/// as `null`, so it decodes into `NoBody` or `Option` but not into a struct.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return T::deserialize(serde_json::Value::Null)
            .map_err(|e| ApiError::Decoding(e.to_string()));
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::Decoding(e.to_string()))
}
