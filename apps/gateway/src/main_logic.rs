use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::serve;
use igw_ingress_common::Pipeline;
use igw_telemetry::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::GatewayConfig;
use crate::http::build_router;
use crate::sink::{HttpForwarder, LogSink, WebhookSink};

/// Starts the gateway HTTP server and blocks until ctrl-c.
pub async fn run(config: GatewayConfig, metrics: Option<PrometheusHandle>) -> Result<()> {
    let sink: Arc<dyn WebhookSink> = match &config.downstream {
        Some(downstream) => {
            info!(url = %downstream.url, "forwarding verified webhooks downstream");
            Arc::new(HttpForwarder::new(downstream)?)
        }
        None => {
            info!("DOWNSTREAM_URL not set; verified webhooks are logged and accepted");
            Arc::new(LogSink)
        }
    };
    info!(
        platforms = ?config.pipeline.secrets.configured_platforms(),
        "platform secrets loaded"
    );

    let pipeline = Pipeline::new(config.pipeline.clone());
    let sweepers = pipeline.spawn_sweepers(config.sweep_interval, config.bucket_ttl);
    let router = build_router(&pipeline, sink, metrics);

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("bind {}", config.addr))?;
    info!("igw-gateway listening on {}", config.addr);

    let served = serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await;

    for sweeper in sweepers {
        sweeper.abort();
    }
    served.context("serve gateway")
}
