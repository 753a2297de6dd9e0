//! Authentication stage for webhook routes.
//!
//! `GET` requests are subscription handshakes and are answered here without
//! reaching the handler. Every other method must carry a valid signature (or,
//! for Telegram, a matching secret token) before the body is replayed to the
//! handler.

use std::time::Instant;

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{Query, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use igw_core::{Platform, WebhookScheme};
use igw_telemetry::record_webhook;
use security::{Handshake, HandshakeParams, check_secret_token, secret_token_from_headers};
use serde_json::json;

use crate::error::IngressError;
use crate::outcome::Outcome;
use crate::pipeline::Pipeline;
use crate::route::RouteTag;

fn resolve_platform(req: &Request) -> Result<Platform, IngressError> {
    let tag = req.extensions().get::<RouteTag>();
    match tag.and_then(|tag| tag.platform) {
        Some(platform) => Ok(platform),
        None => Err(IngressError::UnknownPlatform(
            tag.and_then(|tag| tag.platform_param.clone())
                .unwrap_or_default(),
        )),
    }
}

/// Answers a `hub.*` verification request.
pub fn handshake(
    pipeline: &Pipeline,
    platform: Platform,
    params: &HandshakeParams,
) -> Result<Response, IngressError> {
    let answer = pipeline
        .verify_tokens()
        .verify(platform, params)
        .map_err(|source| IngressError::Handshake { platform, source })?;
    let mut response = match answer {
        Handshake::Challenge(challenge) => challenge.into_response(),
        Handshake::Verified => Json(json!({ "status": "verified" })).into_response(),
    };
    response.extensions_mut().insert(Outcome::Verified);
    Ok(response)
}

/// Route layer guarding `/webhooks/{platform}` style routes.
pub async fn validate_webhook(
    State(pipeline): State<Pipeline>,
    req: Request,
    next: Next,
) -> Result<Response, IngressError> {
    let platform = resolve_platform(&req)?;

    if req.method() == Method::GET {
        let Query(params) = Query::<HandshakeParams>::try_from_uri(req.uri()).map_err(|err| {
            IngressError::HandshakeQuery {
                platform,
                detail: err.body_text(),
            }
        })?;
        return handshake(&pipeline, platform, &params);
    }

    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let body = to_bytes(body, pipeline.max_body_bytes())
        .await
        .map_err(|err| IngressError::Body {
            platform,
            detail: err.to_string(),
        })?;
    let payload_bytes = body.len();

    let body = match platform.webhook_scheme() {
        WebhookScheme::HubSignature => pipeline
            .signatures()
            .verify(platform, &parts.headers, body)
            .map_err(|source| IngressError::Signature { platform, source })?,
        WebhookScheme::SecretToken => {
            check_secret_token(
                pipeline.secrets().secret_token(platform),
                secret_token_from_headers(&parts.headers),
            )
            .map_err(|source| IngressError::SecretToken { platform, source })?;
            body
        }
    };

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;
    record_webhook(platform.as_str(), payload_bytes, started.elapsed());
    Ok(response)
}
