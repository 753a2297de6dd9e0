//! Assembly of the inbound validation pipeline.
//!
//! Stage order for a webhook request, outermost first: request id,
//! observation, routing, route annotation, general limiter, webhook limiter,
//! tenant limiter, webhook authentication, handler. Any stage may end the
//! request early with an [`IngressError`](crate::IngressError) response.

use std::{sync::Arc, time::Duration};

use axum::{Router, extract::DefaultBodyLimit, middleware};
use igw_backpressure::{RateLimit, RateLimiter, RateLimits};
use security::{PlatformSecrets, SignatureValidator, VerifyTokenValidator};
use tokio::task::JoinHandle;

use crate::observe::observe;
use crate::rate::{general_rate_limit, tenant_rate_limit, webhook_rate_limit};
use crate::reqid::with_request_id;
use crate::route::annotate_route;
use crate::webhook::validate_webhook;

pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub general: RateLimit,
    pub webhook: RateLimit,
    pub tenant: RateLimits,
    pub secrets: PlatformSecrets,
    pub max_body_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            general: RateLimit::new(100.0, 200.0),
            webhook: RateLimit::new(50.0, 100.0),
            tenant: RateLimits::new(RateLimit::new(20.0, 40.0)),
            secrets: PlatformSecrets::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Shared state for every pipeline stage. Cloning is cheap and clones share
/// limiter buckets.
#[derive(Clone, Debug)]
pub struct Pipeline {
    general: RateLimiter,
    webhook: RateLimiter,
    tenant: RateLimiter,
    signatures: SignatureValidator,
    verify_tokens: VerifyTokenValidator,
    secrets: Arc<PlatformSecrets>,
    max_body_bytes: usize,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let secrets = Arc::new(config.secrets);
        Self {
            general: RateLimiter::new("general", config.general),
            webhook: RateLimiter::new("webhook", config.webhook),
            tenant: RateLimiter::with_limits("tenant", config.tenant),
            signatures: SignatureValidator::new(secrets.clone()),
            verify_tokens: VerifyTokenValidator::new(secrets.clone()),
            secrets,
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn general_limiter(&self) -> &RateLimiter {
        &self.general
    }

    pub fn webhook_limiter(&self) -> &RateLimiter {
        &self.webhook
    }

    pub fn tenant_limiter(&self) -> &RateLimiter {
        &self.tenant
    }

    pub fn signatures(&self) -> &SignatureValidator {
        &self.signatures
    }

    pub fn verify_tokens(&self) -> &VerifyTokenValidator {
        &self.verify_tokens
    }

    pub fn secrets(&self) -> &PlatformSecrets {
        &self.secrets
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Adds the webhook limiter, tenant limiter and authentication stages to
    /// every route in `routes`. Routes must expose a `{platform}` parameter.
    ///
    /// Body extractors on these routes are capped at `max_body_bytes`
    /// instead of axum's 2 MiB default.
    pub fn protect_webhooks<S>(&self, routes: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        routes
            .route_layer(DefaultBodyLimit::max(self.max_body_bytes))
            .route_layer(middleware::from_fn_with_state(self.clone(), validate_webhook))
            .route_layer(middleware::from_fn_with_state(self.clone(), tenant_rate_limit))
            .route_layer(middleware::from_fn_with_state(self.clone(), webhook_rate_limit))
    }

    /// Adds the stages shared by every route. Call once on the fully merged
    /// router.
    pub fn protect_all<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router
            .route_layer(middleware::from_fn_with_state(self.clone(), general_rate_limit))
            .route_layer(middleware::from_fn(annotate_route))
            .layer(middleware::from_fn(observe))
            .layer(middleware::from_fn(with_request_id))
    }

    /// One idle-bucket sweeper per limiter; abort the handles on shutdown.
    pub fn spawn_sweepers(&self, interval: Duration, ttl: Duration) -> Vec<JoinHandle<()>> {
        [&self.general, &self.webhook, &self.tenant]
            .into_iter()
            .map(|limiter| limiter.spawn_sweeper(interval, ttl))
            .collect()
    }
}
