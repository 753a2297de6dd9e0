//! Telemetry bootstrap for integration gateway services.
//!
//! Logging goes through `tracing` with an env-filtered JSON or plain
//! formatter and optional OTLP span export; metrics go through the
//! `metrics` facade and are exposed in Prometheus text format.

mod config;
mod context;
pub mod recorder;
mod tracing_init;

pub use config::{TelemetryConfig, TelemetryProtocol};
pub use context::RequestLabels;
pub use recorder::{
    install_prometheus, prometheus_recorder, record_error, record_rate_limit_hit, record_request,
    record_webhook,
};
pub use metrics_exporter_prometheus::{PrometheusHandle, PrometheusRecorder};
pub use tracing_init::{init_telemetry, shutdown_telemetry};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to initialise tracing: {0}")]
    TracingInit(String),
    #[error("failed to initialise metrics: {0}")]
    MetricsInit(String),
}
