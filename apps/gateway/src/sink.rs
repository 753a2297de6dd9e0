//! Destinations for authenticated webhook deliveries.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use igw_core::Platform;
use tracing::{error, info, warn};

use crate::config::DownstreamConfig;

pub const PLATFORM_HEADER: &str = "x-igw-platform";
pub const TENANT_HEADER: &str = "x-igw-tenant";

/// A verified request body plus the routing facts the pipeline resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDelivery {
    pub platform: Platform,
    pub tenant: Option<String>,
    pub request_id: String,
    pub body: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("HTTP delivery failed: {0}")]
    Http(#[source] anyhow::Error),
}

#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<(), SinkError>;
}

/// Accepts everything and logs it; used when no downstream is configured.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl WebhookSink for LogSink {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<(), SinkError> {
        info!(
            platform = %delivery.platform,
            tenant = delivery.tenant.as_deref().unwrap_or("none"),
            request_id = %delivery.request_id,
            bytes = delivery.body.len(),
            "webhook accepted without downstream"
        );
        Ok(())
    }
}

/// Keeps deliveries in memory; used in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<WebhookDelivery>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<WebhookDelivery> {
        match self.deliveries.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl WebhookSink for RecordingSink {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<(), SinkError> {
        match self.deliveries.lock() {
            Ok(mut guard) => guard.push(delivery),
            Err(poisoned) => poisoned.into_inner().push(delivery),
        }
        Ok(())
    }
}

/// POSTs the body unchanged to `{url}/{platform}`.
pub struct HttpForwarder {
    client: reqwest::Client,
    url: String,
    max_retries: u8,
}

impl HttpForwarder {
    pub fn new(config: &DownstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build downstream HTTP client")?;
        Ok(Self {
            client,
            url: config.url.clone(),
            max_retries: config.max_retries,
        })
    }

    fn target(&self, platform: Platform) -> String {
        format!("{}/{}", self.url, platform.as_str())
    }

    async fn send_once(&self, delivery: &WebhookDelivery) -> Result<(), SinkError> {
        let mut request = self
            .client
            .post(self.target(delivery.platform))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(PLATFORM_HEADER, delivery.platform.as_str())
            .header(igw_ingress_common::REQUEST_ID_HEADER, &delivery.request_id)
            .body(delivery.body.clone());
        if let Some(tenant) = &delivery.tenant {
            request = request.header(TENANT_HEADER, tenant);
        }
        let response = request
            .send()
            .await
            .map_err(|e| SinkError::Http(anyhow::Error::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Http(anyhow::anyhow!(
                "HTTP {} from downstream: {}",
                status,
                body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl WebhookSink for HttpForwarder {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<(), SinkError> {
        let mut attempt: u16 = 0;
        loop {
            attempt += 1;
            match self.send_once(&delivery).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    let url = self.target(delivery.platform);
                    if attempt > u16::from(self.max_retries) {
                        error!(attempt, url = %url, error = %err, "downstream delivery failed");
                        return Err(err);
                    }
                    warn!(attempt, url = %url, error = %err, "retrying downstream delivery");
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
            }
        }
    }
}
