use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use igw_core::Platform;
use security::{SecretTokenError, SignatureError, VerifyTokenError};
use serde::{Deserialize, Serialize};

use crate::outcome::Outcome;
use crate::rate::LimiterKind;

pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const FORBIDDEN: &str = "FORBIDDEN";
pub const BAD_REQUEST: &str = "BAD_REQUEST";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
pub const DOWNSTREAM_ERROR: &str = "DOWNSTREAM_ERROR";

/// Uniform JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Drives log severity and whether `errors_total` is incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Admission,
    Authentication,
    Configuration,
    Protocol,
    NotFound,
    Downstream,
}

/// Attached to error responses so the observation layer can report what
/// happened without re-deriving it from the status code.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub outcome: Outcome,
    pub code: &'static str,
    pub class: ErrorClass,
    pub platform: Option<Platform>,
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("{limiter} rate limit exceeded")]
    RateLimited { limiter: LimiterKind },
    #[error("unknown platform `{0}`")]
    UnknownPlatform(String),
    #[error("{platform} signature check failed: {source}")]
    Signature {
        platform: Platform,
        source: SignatureError,
    },
    #[error("{platform} verification handshake failed: {source}")]
    Handshake {
        platform: Platform,
        source: VerifyTokenError,
    },
    #[error("{platform} verification query unreadable: {detail}")]
    HandshakeQuery { platform: Platform, detail: String },
    #[error("{platform} secret token check failed: {source}")]
    SecretToken {
        platform: Platform,
        source: SecretTokenError,
    },
    #[error("{platform} request body unreadable: {detail}")]
    Body { platform: Platform, detail: String },
    #[error("{platform} downstream delivery failed: {detail}")]
    Downstream { platform: Platform, detail: String },
}

impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngressError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            IngressError::UnknownPlatform(_) => StatusCode::NOT_FOUND,
            IngressError::Signature { source, .. } => match source {
                SignatureError::MissingSecret { .. } | SignatureError::InvalidKey => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                SignatureError::MissingHeader | SignatureError::Mismatch => {
                    StatusCode::UNAUTHORIZED
                }
            },
            IngressError::Handshake { source, .. } => match source {
                VerifyTokenError::InvalidMode | VerifyTokenError::MissingToken => {
                    StatusCode::BAD_REQUEST
                }
                VerifyTokenError::MissingConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                VerifyTokenError::Mismatch => StatusCode::FORBIDDEN,
            },
            IngressError::SecretToken { .. } => StatusCode::UNAUTHORIZED,
            IngressError::HandshakeQuery { .. } | IngressError::Body { .. } => {
                StatusCode::BAD_REQUEST
            }
            IngressError::Downstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            IngressError::RateLimited { limiter } => limiter.code(),
            _ => match self.status() {
                StatusCode::UNAUTHORIZED => UNAUTHORIZED,
                StatusCode::FORBIDDEN => FORBIDDEN,
                StatusCode::BAD_REQUEST => BAD_REQUEST,
                StatusCode::NOT_FOUND => NOT_FOUND,
                StatusCode::BAD_GATEWAY => DOWNSTREAM_ERROR,
                _ => INTERNAL_ERROR,
            },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self.status() {
            StatusCode::TOO_MANY_REQUESTS => ErrorClass::Admission,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorClass::Authentication,
            StatusCode::BAD_REQUEST => ErrorClass::Protocol,
            StatusCode::NOT_FOUND => ErrorClass::NotFound,
            StatusCode::BAD_GATEWAY => ErrorClass::Downstream,
            _ => ErrorClass::Configuration,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self.class() {
            ErrorClass::Admission => Outcome::RejectedRateLimit,
            ErrorClass::Authentication if self.status() == StatusCode::FORBIDDEN => {
                Outcome::RejectedForbidden
            }
            ErrorClass::Authentication => Outcome::RejectedUnauthorized,
            ErrorClass::Protocol => Outcome::RejectedBadRequest,
            ErrorClass::Configuration => Outcome::RejectedConfigError,
            ErrorClass::NotFound => Outcome::NotFound,
            ErrorClass::Downstream => Outcome::HandlerError,
        }
    }

    pub fn platform(&self) -> Option<Platform> {
        match self {
            IngressError::RateLimited { .. } | IngressError::UnknownPlatform(_) => None,
            IngressError::Signature { platform, .. }
            | IngressError::Handshake { platform, .. }
            | IngressError::HandshakeQuery { platform, .. }
            | IngressError::SecretToken { platform, .. }
            | IngressError::Body { platform, .. }
            | IngressError::Downstream { platform, .. } => Some(*platform),
        }
    }

    /// Client-facing text; configuration faults never name the missing value.
    pub fn public_message(&self) -> String {
        match self {
            IngressError::RateLimited { limiter } => limiter.message().to_string(),
            IngressError::UnknownPlatform(platform) => format!("unknown platform `{platform}`"),
            IngressError::Signature { source, .. } => match source {
                SignatureError::MissingSecret { .. } | SignatureError::InvalidKey => {
                    "internal server error".into()
                }
                SignatureError::MissingHeader => "missing webhook signature".into(),
                SignatureError::Mismatch => "invalid webhook signature".into(),
            },
            IngressError::Handshake { source, .. } => match source {
                VerifyTokenError::MissingConfig { .. } => "internal server error".into(),
                other => other.to_string(),
            },
            IngressError::HandshakeQuery { .. } => "malformed verification query".into(),
            IngressError::SecretToken { .. } => "invalid secret token".into(),
            IngressError::Body { .. } => "request body could not be read".into(),
            IngressError::Downstream { .. } => "downstream service unavailable".into(),
        }
    }

    pub fn rejection(&self) -> Rejection {
        Rejection {
            outcome: self.outcome(),
            code: self.code(),
            class: self.class(),
            platform: self.platform(),
            detail: self.to_string(),
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.public_message(),
        };
        let mut response = (self.status(), Json(body)).into_response();
        response.extensions_mut().insert(self.rejection());
        response
    }
}
