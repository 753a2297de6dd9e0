use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use igw_backpressure::{OverridesError, RateLimit, RateLimits};
use igw_core::Platform;
use igw_ingress_common::{DEFAULT_MAX_BODY_BYTES, PipelineConfig};
use security::{PlatformSecret, PlatformSecrets};

const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has invalid value `{value}`: expected {expected}")]
    Invalid {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("TENANT_RATE_LIMITS: {0}")]
    TenantOverrides(#[from] OverridesError),
}

/// Where verified deliveries go when `DOWNSTREAM_URL` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_retries: u8,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub addr: SocketAddr,
    pub pipeline: PipelineConfig,
    pub bucket_ttl: Duration,
    pub sweep_interval: Duration,
    pub downstream: Option<DownstreamConfig>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration through `lookup` so callers control the
    /// variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let addr = parse_or(&get, "BIND", "a socket address", || DEFAULT_BIND)?;

        let general = rate_limit(&get, "RATE_LIMIT", 100.0, 200.0)?;
        let webhook = rate_limit(&get, "WEBHOOK_RATE_LIMIT", 50.0, 100.0)?;
        let mut tenant = RateLimits::new(rate_limit(&get, "TENANT_RATE_LIMIT", 20.0, 40.0)?);
        if let Some(raw) = get("TENANT_RATE_LIMITS") {
            tenant = tenant.with_overrides_json(&raw)?;
        }

        let max_body_bytes = parse_or(&get, "MAX_WEBHOOK_BODY_BYTES", "a byte count", || {
            DEFAULT_MAX_BODY_BYTES
        })?;
        let bucket_ttl = secs_or(&get, "RATE_LIMIT_BUCKET_TTL_SECS", 600)?;
        let sweep_interval = secs_or(&get, "RATE_LIMIT_SWEEP_INTERVAL_SECS", 60)?;

        let downstream = match get("DOWNSTREAM_URL") {
            Some(url) => Some(DownstreamConfig {
                url: url.trim_end_matches('/').to_string(),
                timeout: secs_or(&get, "DOWNSTREAM_TIMEOUT_SECS", 10)?,
                max_retries: parse_or(&get, "DOWNSTREAM_MAX_RETRIES", "an integer 0-255", || 0)?,
            }),
            None => None,
        };

        Ok(Self {
            addr,
            pipeline: PipelineConfig {
                general,
                webhook,
                tenant,
                secrets: platform_secrets(&get),
                max_body_bytes,
            },
            bucket_ttl,
            sweep_interval,
            downstream,
        })
    }
}

fn platform_secrets<G>(get: &G) -> PlatformSecrets
where
    G: Fn(&str) -> Option<String>,
{
    let entries: HashMap<Platform, PlatformSecret> = Platform::ALL
        .iter()
        .map(|platform| {
            let prefix = platform.env_prefix();
            let secret = PlatformSecret {
                webhook_secret: get(format!("{prefix}_WEBHOOK_SECRET").as_str()),
                verify_token: get(format!("{prefix}_VERIFY_TOKEN").as_str()),
                secret_token: get(format!("{prefix}_SECRET_TOKEN").as_str()),
            };
            (*platform, secret)
        })
        .collect();
    PlatformSecrets::new(entries)
}

fn parse_or<G, T, D>(get: &G, key: &str, expected: &'static str, default: D) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    D: FnOnce() -> T,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
            expected,
        }),
        None => Ok(default()),
    }
}

fn secs_or<G>(get: &G, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, "a whole number of seconds", || default).map(Duration::from_secs)
}

fn rate_limit<G>(get: &G, prefix: &str, rps: f64, burst: f64) -> Result<RateLimit, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let rps: f64 = parse_or(get, &format!("{prefix}_RPS"), "a number", || rps)?;
    let burst: f64 = parse_or(get, &format!("{prefix}_BURST"), "a number", || burst)?;
    Ok(RateLimit::new(rps, burst))
}
