//! Payload codec: canonical JSON, then unpadded base64url.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// The segment was not valid base64url, or the JSON did not match the
/// expected schema exactly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("not base64url: {0}")]
    Encoding(String),

    #[error("schema mismatch: {0}")]
    Schema(String),
}

/// The payload could not be represented as JSON (a map with non-string
/// keys, a failing `Serialize` impl).
#[derive(Debug, Error)]
#[error("payload cannot be encoded: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Serialize a payload into the URL-safe text segment.
pub fn encode<T: Serialize>(payload: &T) -> Result<String, EncodeError> {
    let json = serde_json::to_vec(payload)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Inverse of [`encode`]. Rejects padding, stray characters, trailing
/// bits, unknown fields, missing fields and mistyped fields.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| DecodeError::Encoding(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| DecodeError::Schema(e.to_string()))
}
