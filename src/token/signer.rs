//! HMAC-SHA256 over the encoded payload segment.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::secret::Secret;

type HmacSha256 = Hmac<Sha256>;

/// Compute the signature segment for `encoded_payload`.
pub fn sign(encoded_payload: &str, secret: &Secret) -> String {
    URL_SAFE_NO_PAD.encode(hmac_sha256(secret.as_bytes(), encoded_payload.as_bytes()))
}

/// Compute HMAC-SHA256.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
