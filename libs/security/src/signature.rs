use std::sync::Arc;

use bytes::Bytes;
use hmac::{Hmac, Mac};
use http::HeaderMap;
use igw_core::Platform;
use sha2::Sha256;

use crate::compare::constant_time_eq;
use crate::secrets::PlatformSecrets;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("no webhook secret configured for {platform}")]
    MissingSecret { platform: Platform },
    #[error("missing x-hub-signature-256 header")]
    MissingHeader,
    #[error("webhook signature mismatch")]
    Mismatch,
    #[error("webhook secret rejected as an HMAC key")]
    InvalidKey,
}

/// Lowercase hex HMAC-SHA256 of `body` keyed by `secret`.
///
/// ```
/// let digest = security::signature::compute_signature("testsecret", b"{}")?;
/// assert_eq!(digest.len(), 64);
/// # Ok::<(), security::SignatureError>(())
/// ```
pub fn compute_signature(secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Header value a platform would send for `body`, i.e. `sha256=<hex>`.
pub fn signature_header_value(secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    Ok(format!("{SIGNATURE_PREFIX}{}", compute_signature(secret, body)?))
}

/// Checks a raw `X-Hub-Signature-256` value against `body`.
pub fn signature_matches(
    secret: &str,
    body: &[u8],
    header_value: &str,
) -> Result<bool, SignatureError> {
    let Some(provided) = header_value.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return Ok(false);
    };
    let expected = compute_signature(secret, body)?;
    Ok(constant_time_eq(provided.as_bytes(), expected.as_bytes()))
}

/// Verifies `X-Hub-Signature-256` over the exact bytes received.
#[derive(Clone, Debug)]
pub struct SignatureValidator {
    secrets: Arc<PlatformSecrets>,
}

impl SignatureValidator {
    pub fn new(secrets: Arc<PlatformSecrets>) -> Self {
        Self { secrets }
    }

    /// Returns `body` untouched on success so the caller can replay it.
    pub fn verify(
        &self,
        platform: Platform,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Bytes, SignatureError> {
        let secret = self
            .secrets
            .webhook_secret(platform)
            .ok_or(SignatureError::MissingSecret { platform })?;
        let provided = headers
            .get(SIGNATURE_HEADER)
            .ok_or(SignatureError::MissingHeader)?;
        let provided = provided.to_str().map_err(|_| SignatureError::Mismatch)?;
        if provided.trim().is_empty() {
            return Err(SignatureError::MissingHeader);
        }
        if signature_matches(secret, &body, provided)? {
            Ok(body)
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}
