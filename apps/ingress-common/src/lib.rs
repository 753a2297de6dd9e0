//! Inbound validation pipeline for the integration gateway: rate limiting,
//! webhook authentication and per-request observation, packaged as axum
//! middleware around caller-supplied handlers.

pub mod client_ip;
pub mod error;
pub mod observe;
pub mod outcome;
pub mod pipeline;
pub mod rate;
pub mod reqid;
pub mod respond;
pub mod route;
pub mod tenant;
pub mod webhook;

pub use client_ip::client_ip;
pub use error::{ErrorBody, ErrorClass, IngressError, Rejection};
pub use outcome::Outcome;
pub use pipeline::{DEFAULT_MAX_BODY_BYTES, Pipeline, PipelineConfig};
pub use rate::LimiterKind;
pub use reqid::{REQUEST_ID_HEADER, RequestId};
pub use respond::accepted;
pub use route::RouteTag;
pub use tenant::resolve_tenant;
