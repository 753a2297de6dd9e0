use axum::http::StatusCode;

/// Terminal state of one request through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Webhook authenticated and accepted by the downstream handler.
    Forwarded,
    /// Subscription handshake answered.
    Verified,
    /// Any other successful route (health, metrics).
    Completed,
    RejectedRateLimit,
    RejectedUnauthorized,
    RejectedBadRequest,
    RejectedForbidden,
    RejectedConfigError,
    NotFound,
    HandlerError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Forwarded => "forwarded",
            Outcome::Verified => "verified",
            Outcome::Completed => "completed",
            Outcome::RejectedRateLimit => "rejected_rate_limit",
            Outcome::RejectedUnauthorized => "rejected_unauthorized",
            Outcome::RejectedBadRequest => "rejected_bad_request",
            Outcome::RejectedForbidden => "rejected_forbidden",
            Outcome::RejectedConfigError => "rejected_config_error",
            Outcome::NotFound => "not_found",
            Outcome::HandlerError => "handler_error",
        }
    }

    /// Fallback when no stage annotated the response.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => Outcome::NotFound,
            StatusCode::TOO_MANY_REQUESTS => Outcome::RejectedRateLimit,
            StatusCode::UNAUTHORIZED => Outcome::RejectedUnauthorized,
            StatusCode::FORBIDDEN => Outcome::RejectedForbidden,
            s if s.is_client_error() => Outcome::RejectedBadRequest,
            s if s.is_server_error() => Outcome::HandlerError,
            _ => Outcome::Completed,
        }
    }
}
