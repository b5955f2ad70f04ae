//! Token verification.
//!
//! Order matters: the signature is checked against the exact payload
//! segment before anything is decoded, so decode errors are only ever
//! produced for data this server signed itself.

use serde::de::DeserializeOwned;
use subtle::ConstantTimeEq;

use super::{codec, sign, Rejection, SessionPayload, SEPARATOR};
use crate::secret::Secret;

/// Verify `token` against the current wall clock.
pub fn verify<C: DeserializeOwned>(
    token: &str,
    secret: &Secret,
) -> Result<SessionPayload<C>, Rejection> {
    verify_at(token, secret, chrono::Utc::now().timestamp_millis())
}

/// Verify `token` as of `now_ms` (Unix milliseconds).
pub fn verify_at<C: DeserializeOwned>(
    token: &str,
    secret: &Secret,
    now_ms: i64,
) -> Result<SessionPayload<C>, Rejection> {
    let (body, signature) = split(token)?;

    let expected = sign(body, secret);
    // Slice ct_eq returns false on length mismatch without short-circuiting
    // on content.
    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        return Err(Rejection::InvalidSignature);
    }

    let payload: SessionPayload<C> = codec::decode(body)?;

    if payload.is_expired_at(now_ms) {
        return Err(Rejection::Expired);
    }

    Ok(payload)
}

/// Exactly one separator, two segments.
fn split(token: &str) -> Result<(&str, &str), Rejection> {
    let mut parts = token.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(body), Some(signature), None) => Ok((body, signature)),
        _ => Err(Rejection::MalformedToken),
    }
}
