//! Inbound webhook authentication for the integration gateway.
//!
//! The checks here are pure functions over configuration, headers and body
//! bytes; logging, metrics and HTTP responses belong to the ingress pipeline.
pub mod compare;
pub mod secret_token;
pub mod secrets;
pub mod signature;
pub mod verify_token;

pub use compare::constant_time_eq;
pub use secret_token::{
    SECRET_TOKEN_HEADER, SecretTokenError, check_secret_token, secret_token_from_headers,
};
pub use secrets::{PlatformSecret, PlatformSecrets};
pub use signature::{SIGNATURE_HEADER, SignatureError, SignatureValidator};
pub use verify_token::{Handshake, HandshakeParams, VerifyTokenError, VerifyTokenValidator};
