use metrics::Label;

/// Labels attached to per-request metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLabels {
    pub method: String,
    pub route: String,
    pub platform: Option<String>,
    pub tenant: Option<String>,
    pub status: u16,
}

impl RequestLabels {
    pub fn new(method: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            route: route.into(),
            ..Default::default()
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Label set in a fixed order; absent platform/tenant render as `none`.
    pub fn tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("method", self.method.clone()),
            ("route", self.route.clone()),
            (
                "platform",
                self.platform.clone().unwrap_or_else(|| "none".into()),
            ),
            ("tenant", self.tenant.clone().unwrap_or_else(|| "none".into())),
            ("status", self.status.to_string()),
        ]
    }

    pub(crate) fn labels(&self) -> Vec<Label> {
        self.tags()
            .into_iter()
            .map(|(key, value)| Label::new(key, value))
            .collect()
    }
}
