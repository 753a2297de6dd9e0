use axum::{
    RequestExt,
    extract::{MatchedPath, RawPathParams, Request},
    middleware::Next,
    response::Response,
};
use igw_core::Platform;

use crate::tenant::resolve_tenant;

pub const PLATFORM_PARAM: &str = "platform";
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Routing facts resolved once per request and shared with later stages
/// through request and response extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTag {
    /// Route template, e.g. `/webhooks/{platform}/{tenant_id}`.
    pub route: String,
    /// Raw `{platform}` path segment, if the route has one.
    pub platform_param: Option<String>,
    pub platform: Option<Platform>,
    pub tenant: Option<String>,
}

impl Default for RouteTag {
    fn default() -> Self {
        Self {
            route: UNMATCHED_ROUTE.to_string(),
            platform_param: None,
            platform: None,
            tenant: None,
        }
    }
}

/// Route layer that records the matched route, platform and tenant.
pub async fn annotate_route(mut req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let params: Vec<(String, String)> = match req.extract_parts::<RawPathParams>().await {
        Ok(raw) => raw
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        Err(_) => Vec::new(),
    };
    let platform_param = params
        .iter()
        .find(|(key, _)| key == PLATFORM_PARAM)
        .map(|(_, value)| value.clone());
    let tag = RouteTag {
        route,
        platform: platform_param
            .as_deref()
            .and_then(|raw| raw.parse::<Platform>().ok()),
        platform_param,
        tenant: resolve_tenant(req.uri(), &params, req.headers()),
    };

    req.extensions_mut().insert(tag.clone());
    let mut response = next.run(req).await;
    response.extensions_mut().insert(tag);
    response
}
