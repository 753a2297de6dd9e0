use std::collections::HashMap;
use std::fmt;

use igw_core::Platform;

/// Shared values configured for one platform. Empty strings count as unset.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PlatformSecret {
    pub webhook_secret: Option<String>,
    pub verify_token: Option<String>,
    pub secret_token: Option<String>,
}

impl fmt::Debug for PlatformSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformSecret")
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("verify_token", &redact(&self.verify_token))
            .field("secret_token", &redact(&self.secret_token))
            .finish()
    }
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<set>",
        None => "<unset>",
    }
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    (!value.trim().is_empty()).then_some(value)
}

/// Immutable platform → secret mapping loaded once at start-up.
///
/// ```
/// use igw_core::Platform;
/// use security::PlatformSecrets;
///
/// let secrets = PlatformSecrets::default()
///     .with_webhook_secret(Platform::WhatsApp, "app-secret")
///     .with_verify_token(Platform::WhatsApp, "verify-me");
/// assert_eq!(secrets.webhook_secret(Platform::WhatsApp), Some("app-secret"));
/// assert_eq!(secrets.verify_token(Platform::Messenger), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct PlatformSecrets {
    entries: HashMap<Platform, PlatformSecret>,
}

impl PlatformSecrets {
    pub fn new(entries: HashMap<Platform, PlatformSecret>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(platform, secret)| {
                let secret = PlatformSecret {
                    webhook_secret: secret.webhook_secret.and_then(non_empty),
                    verify_token: secret.verify_token.and_then(non_empty),
                    secret_token: secret.secret_token.and_then(non_empty),
                };
                (platform, secret)
            })
            .collect();
        Self { entries }
    }

    pub fn with_webhook_secret(mut self, platform: Platform, secret: impl Into<String>) -> Self {
        self.entries.entry(platform).or_default().webhook_secret = non_empty(secret);
        self
    }

    pub fn with_verify_token(mut self, platform: Platform, token: impl Into<String>) -> Self {
        self.entries.entry(platform).or_default().verify_token = non_empty(token);
        self
    }

    pub fn with_secret_token(mut self, platform: Platform, token: impl Into<String>) -> Self {
        self.entries.entry(platform).or_default().secret_token = non_empty(token);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<&PlatformSecret> {
        self.entries.get(&platform)
    }

    pub fn webhook_secret(&self, platform: Platform) -> Option<&str> {
        self.get(platform)?.webhook_secret.as_deref()
    }

    pub fn verify_token(&self, platform: Platform) -> Option<&str> {
        self.get(platform)?.verify_token.as_deref()
    }

    pub fn secret_token(&self, platform: Platform) -> Option<&str> {
        self.get(platform)?.secret_token.as_deref()
    }

    /// Platforms with at least one configured value, in stable order.
    pub fn configured_platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self
            .entries
            .iter()
            .filter(|(_, secret)| {
                secret.webhook_secret.is_some()
                    || secret.verify_token.is_some()
                    || secret.secret_token.is_some()
            })
            .map(|(platform, _)| *platform)
            .collect();
        platforms.sort();
        platforms
    }
}
