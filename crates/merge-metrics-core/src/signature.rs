//! Webhook signature verification.
//!
//! GitHub signs each delivery with `HMAC-SHA256(secret, raw_body)` and sends
//! the hex digest in the `x-hub-signature-256` header as `sha256=<hex>`.

use crate::ValidationError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

// ============================================================================
// Secret container
// ============================================================================

/// Secret string that never appears in logs and is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue {
    inner: String,
}

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Get secret as string (only for immediate use)
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    pub fn expose_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.trim().is_empty()
    }

    /// Get secret length without exposing content
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue::new)
    }
}

// ============================================================================
// Signing and verification
// ============================================================================

/// Compute the `sha256=<hex>` signature GitHub would send for `raw_body`.
pub fn sign_payload(raw_body: &[u8], secret: &SecretValue) -> Result<String, ValidationError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_bytes()).map_err(|_| {
        ValidationError::InvalidFormat {
            field: "secret".to_string(),
            message: "secret cannot be used as HMAC key".to_string(),
        }
    })?;
    mac.update(raw_body);

    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check a delivery signature against the shared secret.
///
/// Returns `false` when the header is absent or its length differs from the
/// expected signature; otherwise compares in constant time.
pub fn verify_signature(
    raw_body: &[u8],
    signature_header: Option<&str>,
    secret: &SecretValue,
) -> bool {
    let Some(provided) = signature_header else {
        return false;
    };

    let Ok(expected) = sign_payload(raw_body, secret) else {
        return false;
    };

    if expected.len() != provided.len() {
        return false;
    }

    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
