use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Extension, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use igw_ingress_common::{IngressError, Pipeline, RequestId, RouteTag, accepted};
use igw_telemetry::PrometheusHandle;

use crate::sink::{WebhookDelivery, WebhookSink};

pub const WEBHOOK_ROUTE: &str = "/webhooks/{platform}";
pub const TENANT_WEBHOOK_ROUTE: &str = "/webhooks/{platform}/{tenant_id}";

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Clone)]
pub struct GatewayState {
    pub sink: Arc<dyn WebhookSink>,
}

/// Webhook, health and (when a recorder is installed) metrics routes, wrapped
/// in the full validation pipeline.
pub fn build_router(
    pipeline: &Pipeline,
    sink: Arc<dyn WebhookSink>,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let webhooks = Router::new()
        .route(WEBHOOK_ROUTE, any(deliver))
        .route(TENANT_WEBHOOK_ROUTE, any(deliver))
        .with_state(GatewayState { sink });

    let mut router = Router::new()
        .merge(pipeline.protect_webhooks(webhooks))
        .route("/healthz", get(healthz));
    if let Some(handle) = metrics {
        router = router.route("/metrics", get(move || render_metrics(handle.clone())));
    }
    pipeline.protect_all(router)
}

/// Runs only after the pipeline authenticated the request.
pub async fn deliver(
    State(state): State<GatewayState>,
    Extension(tag): Extension<RouteTag>,
    request_id: Option<Extension<RequestId>>,
    body: Bytes,
) -> Result<Response, IngressError> {
    let platform = tag
        .platform
        .ok_or_else(|| IngressError::UnknownPlatform(tag.platform_param.clone().unwrap_or_default()))?;
    let request_id = request_id
        .map(|Extension(rid)| rid.0)
        .unwrap_or_default();

    state
        .sink
        .deliver(WebhookDelivery {
            platform,
            tenant: tag.tenant.clone(),
            request_id: request_id.clone(),
            body,
        })
        .await
        .map_err(|err| IngressError::Downstream {
            platform,
            detail: err.to_string(),
        })?;

    Ok(accepted(Some(request_id.as_str())))
}

async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn render_metrics(handle: PrometheusHandle) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        handle.render(),
    )
}
