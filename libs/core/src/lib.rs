//! Integration gateway core value types.
//!
//! Every other crate in the workspace identifies the third-party platform a
//! request belongs to through [`Platform`]; nothing here performs I/O.
pub mod platform;

pub use platform::{Platform, UnknownPlatform, WebhookScheme};
