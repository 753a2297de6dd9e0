use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Third-party platforms that deliver webhooks to the gateway.
///
/// ```
/// use igw_core::Platform;
///
/// let p: Platform = "whatsapp".parse().unwrap();
/// assert_eq!(p, Platform::WhatsApp);
/// assert_eq!(p.env_prefix(), "WHATSAPP");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    #[serde(rename = "whatsapp")]
    WhatsApp,
    #[serde(rename = "telegram")]
    Telegram,
    #[serde(rename = "messenger")]
    Messenger,
    #[serde(rename = "instagram")]
    Instagram,
    #[serde(rename = "webchat")]
    WebChat,
    #[serde(rename = "tawkto")]
    TawkTo,
    #[serde(rename = "mercadopago")]
    MercadoPago,
    #[serde(rename = "google_calendar")]
    GoogleCalendar,
}

/// How a platform proves that a delivery came from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookScheme {
    /// `X-Hub-Signature-256` HMAC on deliveries plus the `hub.*` GET handshake.
    HubSignature,
    /// Optional `X-Telegram-Bot-Api-Secret-Token` shared value.
    SecretToken,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::WhatsApp,
        Platform::Telegram,
        Platform::Messenger,
        Platform::Instagram,
        Platform::WebChat,
        Platform::TawkTo,
        Platform::MercadoPago,
        Platform::GoogleCalendar,
    ];

    /// Lowercase identifier used in routes, metric labels and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::WhatsApp => "whatsapp",
            Platform::Telegram => "telegram",
            Platform::Messenger => "messenger",
            Platform::Instagram => "instagram",
            Platform::WebChat => "webchat",
            Platform::TawkTo => "tawkto",
            Platform::MercadoPago => "mercadopago",
            Platform::GoogleCalendar => "google_calendar",
        }
    }

    /// Upper-case prefix for the platform's environment variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Platform::WhatsApp => "WHATSAPP",
            Platform::Telegram => "TELEGRAM",
            Platform::Messenger => "MESSENGER",
            Platform::Instagram => "INSTAGRAM",
            Platform::WebChat => "WEBCHAT",
            Platform::TawkTo => "TAWKTO",
            Platform::MercadoPago => "MERCADOPAGO",
            Platform::GoogleCalendar => "GOOGLE_CALENDAR",
        }
    }

    pub fn webhook_scheme(&self) -> WebhookScheme {
        match self {
            Platform::Telegram => WebhookScheme::SecretToken,
            _ => WebhookScheme::HubSignature,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform `{0}`")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        let platform = match normalized.as_str() {
            "whatsapp" => Platform::WhatsApp,
            "telegram" => Platform::Telegram,
            "messenger" => Platform::Messenger,
            "instagram" => Platform::Instagram,
            "webchat" => Platform::WebChat,
            "tawkto" | "tawk.to" => Platform::TawkTo,
            "mercadopago" | "mercado_pago" => Platform::MercadoPago,
            "google_calendar" | "google-calendar" | "googlecalendar" => Platform::GoogleCalendar,
            _ => return Err(UnknownPlatform(raw.to_string())),
        };
        Ok(platform)
    }
}
