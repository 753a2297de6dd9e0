//! Metric names and recorders for the ingress pipeline.
//!
//! Recording goes through the `metrics` facade, so calls are no-ops until a
//! recorder is installed with [`install_prometheus`] or scoped locally
//! around a [`prometheus_recorder`].

use std::time::Duration;

use metrics::{Label, counter, histogram};
use metrics_exporter_prometheus::{
    Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

use crate::TelemetryError;
use crate::context::RequestLabels;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const WEBHOOK_PAYLOAD_SIZE: &str = "webhook_payload_size_bytes";
pub const WEBHOOK_PROCESSING_DURATION: &str = "webhook_processing_duration_seconds";
pub const RATE_LIMIT_HITS_TOTAL: &str = "rate_limit_hits_total";
pub const ERRORS_TOTAL: &str = "errors_total";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];
const PAYLOAD_BUCKETS: &[f64] = &[
    256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0,
];

/// Prometheus recorder with the gateway's histogram buckets, not yet
/// installed. Tests scope it with [`metrics::with_local_recorder`].
pub fn prometheus_recorder() -> Result<PrometheusRecorder, TelemetryError> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".into()),
            LATENCY_BUCKETS,
        )
        .and_then(|builder| {
            builder.set_buckets_for_metric(
                Matcher::Full(WEBHOOK_PAYLOAD_SIZE.into()),
                PAYLOAD_BUCKETS,
            )
        })
        .map_err(|err| TelemetryError::MetricsInit(err.to_string()))?;
    Ok(builder.build_recorder())
}

/// Installs the global Prometheus recorder and returns the handle used to
/// render `/metrics`. Histograms need [`PrometheusHandle::run_upkeep`]
/// called periodically.
pub fn install_prometheus() -> Result<PrometheusHandle, TelemetryError> {
    let recorder = prometheus_recorder()?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|err| TelemetryError::MetricsInit(err.to_string()))?;
    Ok(handle)
}

/// One observation per finished request.
pub fn record_request(labels: &RequestLabels, elapsed: Duration) {
    counter!(HTTP_REQUESTS_TOTAL, labels.labels()).increment(1);
    histogram!(HTTP_REQUEST_DURATION, labels.labels()).record(elapsed.as_secs_f64());
}

pub fn record_webhook(platform: &str, payload_bytes: usize, elapsed: Duration) {
    let labels = vec![Label::new("platform", platform.to_string())];
    histogram!(WEBHOOK_PAYLOAD_SIZE, labels.clone()).record(payload_bytes as f64);
    histogram!(WEBHOOK_PROCESSING_DURATION, labels).record(elapsed.as_secs_f64());
}

pub fn record_rate_limit_hit(limiter: &'static str, endpoint: &str, key: &str) {
    counter!(
        RATE_LIMIT_HITS_TOTAL,
        "limiter" => limiter,
        "endpoint" => endpoint.to_string(),
        "key" => key.to_string()
    )
    .increment(1);
}

pub fn record_error(code: &'static str, platform: Option<&str>) {
    counter!(
        ERRORS_TOTAL,
        "code" => code,
        "platform" => platform.unwrap_or("none").to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_sample(rendered: &str, name: &str, labels: &[&str], value: &str) -> bool {
        rendered.lines().any(|line| {
            line.starts_with(&format!("{name}{{"))
                && labels.iter().all(|label| line.contains(label))
                && line.ends_with(&format!(" {value}"))
        })
    }

    #[test]
    fn counters_render_with_their_labels() {
        let recorder = prometheus_recorder().unwrap();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            record_rate_limit_hit("webhook", "/webhooks/{platform}", "10.0.0.1");
            record_rate_limit_hit("webhook", "/webhooks/{platform}", "10.0.0.1");
            record_error("UNAUTHORIZED", Some("whatsapp"));
            record_error("INTERNAL_ERROR", None);
        });
        let rendered = handle.render();

        assert!(has_sample(
            &rendered,
            RATE_LIMIT_HITS_TOTAL,
            &[r#"limiter="webhook""#, r#"endpoint="/webhooks/{platform}""#, r#"key="10.0.0.1""#],
            "2",
        ));
        assert!(has_sample(
            &rendered,
            ERRORS_TOTAL,
            &[r#"code="UNAUTHORIZED""#, r#"platform="whatsapp""#],
            "1",
        ));
        assert!(has_sample(
            &rendered,
            ERRORS_TOTAL,
            &[r#"code="INTERNAL_ERROR""#, r#"platform="none""#],
            "1",
        ));
    }

    #[test]
    fn request_observation_feeds_counter_and_histogram() {
        let recorder = prometheus_recorder().unwrap();
        let handle = recorder.handle();
        let labels = RequestLabels::new("POST", "/webhooks/{platform}").with_status(200);
        metrics::with_local_recorder(&recorder, || {
            record_request(&labels, Duration::from_millis(3));
            record_webhook("whatsapp", 2048, Duration::from_millis(2));
        });
        let rendered = handle.render();

        assert!(has_sample(
            &rendered,
            HTTP_REQUESTS_TOTAL,
            &[r#"method="POST""#, r#"status="200""#, r#"tenant="none""#],
            "1",
        ));
        assert!(has_sample(
            &rendered,
            &format!("{HTTP_REQUEST_DURATION}_count"),
            &[r#"method="POST""#],
            "1",
        ));
        assert!(has_sample(
            &rendered,
            &format!("{WEBHOOK_PAYLOAD_SIZE}_bucket"),
            &[r#"platform="whatsapp""#, r#"le="4096""#],
            "1",
        ));
    }
}
