//! Remote-write push configuration.

use crate::error::{ExporterError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of the push loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Time between push cycles
    pub interval: Duration,
    /// Delay before the first readiness probe
    pub grace_period: Duration,
    /// Number of readiness probes before giving up and pushing anyway
    pub readiness_attempts: u32,
    /// Delay between readiness probes
    pub readiness_backoff: Duration,
    /// Upper bound on reading one snapshot from the source
    pub fetch_timeout: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(crate::DEFAULT_PUSH_INTERVAL_SECS),
            grace_period: Duration::from_secs(2),
            readiness_attempts: 5,
            readiness_backoff: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl ScheduleSettings {
    /// Set the push interval. Zero falls back to the default interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_readiness(mut self, attempts: u32, backoff: Duration) -> Self {
        self.readiness_attempts = attempts;
        self.readiness_backoff = backoff;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// The interval actually used by the push loop; never zero.
    pub fn effective_interval(&self) -> Duration {
        if self.interval.is_zero() {
            Duration::from_secs(crate::DEFAULT_PUSH_INTERVAL_SECS)
        } else {
            self.interval
        }
    }
}

/// Where and how to push metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Remote-write endpoint URL
    pub url: String,
    /// Basic-auth user (the Grafana Cloud instance id)
    pub username: String,
    /// Basic-auth password (the API token)
    pub api_token: String,
    /// Local endpoint polled before the first push
    pub health_url: String,
    /// Per-request timeout for probes and pushes
    pub request_timeout: Duration,
    pub schedule: ScheduleSettings,
}

impl PushConfig {
    /// Create a push configuration with default timing.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            api_token: api_token.into(),
            health_url: format!("http://localhost:{}/health", crate::DEFAULT_WEB_PORT),
            request_timeout: Duration::from_secs(10),
            schedule: ScheduleSettings::default(),
        }
    }

    /// Build a configuration from optional credentials.
    ///
    /// Nothing set disables pushing. Some but not all set is an error: the
    /// scheduler must not start with incomplete credentials.
    pub fn from_credentials(
        url: Option<String>,
        username: Option<String>,
        api_token: Option<String>,
    ) -> Result<Option<Self>> {
        let present = |value: Option<String>| value.filter(|v| !v.is_empty());

        match (present(url), present(username), present(api_token)) {
            (Some(url), Some(username), Some(api_token)) => {
                Ok(Some(Self::new(url, username, api_token)))
            }
            (None, None, None) => Ok(None),
            _ => Err(ExporterError::config_error(
                "remote write partially configured; the URL, user and token must all be set",
            )),
        }
    }

    /// Set the local readiness endpoint.
    pub fn with_health_url(mut self, health_url: impl Into<String>) -> Self {
        self.health_url = health_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleSettings) -> Self {
        self.schedule = schedule;
        self
    }
}
