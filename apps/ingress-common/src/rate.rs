use std::fmt;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use igw_backpressure::RateLimiter;
use igw_telemetry::record_rate_limit_hit;

use crate::client_ip::client_ip;
use crate::error::IngressError;
use crate::pipeline::Pipeline;
use crate::route::RouteTag;

/// The three independent admission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterKind {
    /// Client IP, every route.
    General,
    /// Client IP, webhook ingestion routes only.
    Webhook,
    /// Tenant identifier, webhook ingestion routes only.
    Tenant,
}

impl LimiterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimiterKind::General => "general",
            LimiterKind::Webhook => "webhook",
            LimiterKind::Tenant => "tenant",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LimiterKind::General => "RATE_LIMIT_EXCEEDED",
            LimiterKind::Webhook => "WEBHOOK_RATE_LIMIT_EXCEEDED",
            LimiterKind::Tenant => "TENANT_RATE_LIMIT_EXCEEDED",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LimiterKind::General => "too many requests, please retry later",
            LimiterKind::Webhook => "too many webhook deliveries, please retry later",
            LimiterKind::Tenant => "tenant request budget exhausted, please retry later",
        }
    }
}

impl fmt::Display for LimiterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn admit(
    kind: LimiterKind,
    limiter: &RateLimiter,
    key: &str,
    endpoint: &str,
) -> Result<(), IngressError> {
    if limiter.check(key) {
        Ok(())
    } else {
        record_rate_limit_hit(kind.as_str(), endpoint, key);
        Err(IngressError::RateLimited { limiter: kind })
    }
}

fn request_ip(req: &Request) -> String {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_ip(req.headers(), remote)
}

fn endpoint(req: &Request) -> String {
    req.extensions()
        .get::<RouteTag>()
        .map(|tag| tag.route.clone())
        .unwrap_or_else(|| req.uri().path().to_string())
}

/// Per-IP admission applied to every route.
pub async fn general_rate_limit(
    State(pipeline): State<Pipeline>,
    req: Request,
    next: Next,
) -> Result<Response, IngressError> {
    let key = request_ip(&req);
    admit(
        LimiterKind::General,
        pipeline.general_limiter(),
        &key,
        &endpoint(&req),
    )?;
    Ok(next.run(req).await)
}

/// Per-IP admission with the webhook budget.
pub async fn webhook_rate_limit(
    State(pipeline): State<Pipeline>,
    req: Request,
    next: Next,
) -> Result<Response, IngressError> {
    let key = request_ip(&req);
    admit(
        LimiterKind::Webhook,
        pipeline.webhook_limiter(),
        &key,
        &endpoint(&req),
    )?;
    Ok(next.run(req).await)
}

/// Per-tenant admission; requests without a tenant are not limited here.
pub async fn tenant_rate_limit(
    State(pipeline): State<Pipeline>,
    req: Request,
    next: Next,
) -> Result<Response, IngressError> {
    let tenant = req
        .extensions()
        .get::<RouteTag>()
        .and_then(|tag| tag.tenant.clone());
    if let Some(tenant) = tenant {
        admit(
            LimiterKind::Tenant,
            pipeline.tenant_limiter(),
            &tenant,
            &endpoint(&req),
        )?;
    }
    Ok(next.run(req).await)
}
