//! Webhook payload signatures.
//!
//! Receivers verify a delivery by recomputing
//!
//! ```text
//! X-Signature = base64(HMAC-SHA256(secret, body))
//! ```
//!
//! over the exact request body bytes.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Sign a webhook body with the shared secret.
pub fn sign_payload(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any size");
    mac.update(body);
    let bytes = mac.finalize().into_bytes();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
