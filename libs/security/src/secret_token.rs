use http::HeaderMap;

use crate::compare::constant_time_eq;

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("telegram secret token mismatch")]
pub struct SecretTokenError;

/// Advisory check: only a present-but-different token is rejected.
pub fn check_secret_token(
    expected: Option<&str>,
    provided: Option<&str>,
) -> Result<(), SecretTokenError> {
    match (expected, provided) {
        (Some(expected), Some(provided)) => {
            if constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
                Ok(())
            } else {
                Err(SecretTokenError)
            }
        }
        _ => Ok(()),
    }
}

pub fn secret_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
}
