//! Meta-style `hub.*` subscription handshake.

use std::sync::Arc;

use igw_core::Platform;
use serde::Deserialize;

use crate::compare::constant_time_eq;
use crate::secrets::PlatformSecrets;

pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Query parameters sent on the verification GET.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HandshakeParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// Echo this value back as a plain-text body.
    Challenge(String),
    /// Token accepted but the platform sent no challenge.
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyTokenError {
    #[error("hub.mode must be `subscribe`")]
    InvalidMode,
    #[error("hub.verify_token is required")]
    MissingToken,
    #[error("no verify token configured for {platform}")]
    MissingConfig { platform: Platform },
    #[error("hub.verify_token does not match")]
    Mismatch,
}

#[derive(Clone, Debug)]
pub struct VerifyTokenValidator {
    secrets: Arc<PlatformSecrets>,
}

impl VerifyTokenValidator {
    pub fn new(secrets: Arc<PlatformSecrets>) -> Self {
        Self { secrets }
    }

    /// Checks mode, presence, configuration and equality in that order.
    pub fn verify(
        &self,
        platform: Platform,
        params: &HandshakeParams,
    ) -> Result<Handshake, VerifyTokenError> {
        if params.mode.as_deref() != Some(SUBSCRIBE_MODE) {
            return Err(VerifyTokenError::InvalidMode);
        }
        let provided = params
            .verify_token
            .as_deref()
            .ok_or(VerifyTokenError::MissingToken)?;
        let expected = self
            .secrets
            .verify_token(platform)
            .ok_or(VerifyTokenError::MissingConfig { platform })?;
        if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
            return Err(VerifyTokenError::Mismatch);
        }
        Ok(match &params.challenge {
            Some(challenge) => Handshake::Challenge(challenge.clone()),
            None => Handshake::Verified,
        })
    }
}
