use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use igw_telemetry::{RequestLabels, record_error, record_request};
use tracing::{Instrument, field};

use crate::error::{ErrorClass, Rejection};
use crate::outcome::Outcome;
use crate::reqid::RequestId;
use crate::route::{RouteTag, UNMATCHED_ROUTE};

/// Outermost stage after request-id: one span, one metrics observation and
/// one log line per request.
pub async fn observe(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|rid| rid.0.clone())
        .unwrap_or_default();
    let span = tracing::info_span!(
        "ingress.request",
        request_id = %request_id,
        method = %method,
        route = field::Empty,
    );

    let response = next.run(req).instrument(span.clone()).await;
    let elapsed = started.elapsed();

    let tag = response
        .extensions()
        .get::<RouteTag>()
        .cloned()
        .unwrap_or_default();
    let rejection = response.extensions().get::<Rejection>().cloned();
    let status = response.status();
    let outcome = rejection
        .as_ref()
        .map(|rejection| rejection.outcome)
        .or_else(|| response.extensions().get::<Outcome>().copied())
        .unwrap_or_else(|| Outcome::from_status(status));
    let platform = rejection
        .as_ref()
        .and_then(|rejection| rejection.platform)
        .or(tag.platform)
        .map(|platform| platform.as_str().to_string());

    span.record("route", tag.route.as_str());

    let mut labels = RequestLabels::new(method.as_str(), tag.route.as_str())
        .with_status(status.as_u16());
    if let Some(platform) = &platform {
        labels = labels.with_platform(platform.clone());
    }
    if let Some(tenant) = &tag.tenant {
        labels = labels.with_tenant(tenant.clone());
    }
    record_request(&labels, elapsed);

    if let Some(rejection) = &rejection {
        if rejection.class != ErrorClass::Admission {
            record_error(rejection.code, rejection.platform.map(|p| p.as_str()));
        }
    }

    let line = LogLine {
        outcome: outcome.as_str(),
        status: status.as_u16(),
        platform: platform.as_deref().unwrap_or("none"),
        tenant: tag.tenant.as_deref().unwrap_or("none"),
        latency_ms: elapsed.as_secs_f64() * 1000.0,
    };
    span.in_scope(|| emit(&line, rejection.as_ref(), tag.route == UNMATCHED_ROUTE));
    response
}

struct LogLine<'a> {
    outcome: &'static str,
    status: u16,
    platform: &'a str,
    tenant: &'a str,
    latency_ms: f64,
}

fn emit(line: &LogLine<'_>, rejection: Option<&Rejection>, unmatched: bool) {
    let LogLine {
        outcome,
        status,
        platform,
        tenant,
        latency_ms,
    } = *line;

    let Some(rejection) = rejection else {
        if unmatched {
            tracing::debug!(outcome, status, latency_ms, "no route matched");
        } else {
            tracing::info!(outcome, status, platform, tenant, latency_ms, "request completed");
        }
        return;
    };

    let code = rejection.code;
    let detail = rejection.detail.as_str();
    match rejection.class {
        ErrorClass::Admission | ErrorClass::NotFound => {
            tracing::debug!(outcome, status, code, platform, tenant, latency_ms, detail, "request rejected")
        }
        ErrorClass::Protocol => {
            tracing::warn!(outcome, status, code, platform, tenant, latency_ms, detail, "request rejected")
        }
        ErrorClass::Authentication | ErrorClass::Configuration | ErrorClass::Downstream => {
            tracing::error!(outcome, status, code, platform, tenant, latency_ms, detail, "request rejected")
        }
    }
}
