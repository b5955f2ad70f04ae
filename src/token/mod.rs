//! Signed session tokens
//!
//! Wire format: `base64url(json payload)` `.` `base64url(hmac-sha256)`.
//! Both segments use the unpadded URL-safe alphabet, which never contains
//! the `.` separator.

pub mod codec;
mod signer;
mod verifier;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secret::Secret;

pub use codec::{DecodeError, EncodeError};
pub use signer::sign;
pub use verifier::{verify, verify_at};

/// Joins the payload segment and the signature segment.
pub const SEPARATOR: char = '.';

/// Principal claims plus an absolute expiry in Unix milliseconds.
///
/// Decoding is strict: unknown or missing fields on the envelope fail.
/// Claims types are expected to carry `deny_unknown_fields` as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionPayload<C> {
    pub claims: C,
    pub exp: i64,
}

impl<C> SessionPayload<C> {
    pub fn new(claims: C, exp: i64) -> Self {
        Self { claims, exp }
    }

    /// A token is valid strictly before its expiry instant.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.exp
    }
}

/// Why a token was not accepted. Kept server-side only; clients see a
/// uniform "unauthorized".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("malformed token")]
    MalformedToken,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] DecodeError),

    #[error("token expired")]
    Expired,
}

/// Encode, sign and join a payload into a token.
pub fn pack<C: Serialize>(
    payload: &SessionPayload<C>,
    secret: &Secret,
) -> Result<String, EncodeError> {
    let body = codec::encode(payload)?;
    let signature = sign(&body, secret);
    Ok(format!("{}{}{}", body, SEPARATOR, signature))
}
