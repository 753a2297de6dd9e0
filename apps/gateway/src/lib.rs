pub mod config;
pub mod http;
mod main_logic;
pub mod sink;

pub use config::{ConfigError, DownstreamConfig, GatewayConfig};
pub use http::{GatewayState, build_router};
pub use main_logic::run;
pub use sink::{HttpForwarder, LogSink, RecordingSink, SinkError, WebhookDelivery, WebhookSink};
