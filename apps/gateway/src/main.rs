use std::time::Duration;

use anyhow::{Context, Result};
use igw_gateway::{GatewayConfig, run};
use igw_telemetry::{
    TelemetryConfig, init_telemetry, install_prometheus, shutdown_telemetry,
};
use tracing::warn;

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env("igw-gateway", env!("CARGO_PKG_VERSION"));
    init_telemetry(&telemetry)?;

    let metrics = match install_prometheus() {
        Ok(handle) => {
            let upkeep = handle.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(UPKEEP_INTERVAL);
                loop {
                    ticker.tick().await;
                    upkeep.run_upkeep();
                }
            });
            Some(handle)
        }
        Err(err) => {
            warn!(error = %err, "prometheus recorder unavailable; /metrics disabled");
            None
        }
    };

    let config = GatewayConfig::from_env().context("load gateway configuration")?;
    let result = run(config, metrics).await;
    shutdown_telemetry();
    result
}
