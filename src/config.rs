//! Engine configuration.
//!
//! Timeouts and the resend cooldown are deployment concerns and therefore
//! configurable; the retry budget is policy and is not (see
//! [`crate::policy::MAX_RETRIES`]).

use std::time::Duration;
use url::Url;

const DEFAULT_VERIFIER_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RESEND_COOLDOWN_SECONDS: u64 = 60;
const DEFAULT_SUPPORT_URL: &str = "https://support.authflow.dev";

const ENV_VERIFIER_TIMEOUT_SECONDS: &str = "AUTHFLOW_VERIFIER_TIMEOUT_SECONDS";
const ENV_RESEND_COOLDOWN_SECONDS: &str = "AUTHFLOW_RESEND_COOLDOWN_SECONDS";
const ENV_SUPPORT_URL: &str = "AUTHFLOW_SUPPORT_URL";

/// Tunables one flow runs under.
#[derive(Clone, Debug)]
pub struct FlowConfig {
    verifier_timeout: Duration,
    resend_cooldown: Duration,
    support_url: Option<Url>,
}

impl FlowConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            verifier_timeout: Duration::from_secs(DEFAULT_VERIFIER_TIMEOUT_SECONDS),
            resend_cooldown: Duration::from_secs(DEFAULT_RESEND_COOLDOWN_SECONDS),
            support_url: None,
        }
    }

    #[must_use]
    pub fn with_verifier_timeout(mut self, timeout: Duration) -> Self {
        self.verifier_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_resend_cooldown(mut self, cooldown: Duration) -> Self {
        self.resend_cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn with_support_url(mut self, support_url: Url) -> Self {
        self.support_url = Some(support_url);
        self
    }

    /// Deadline applied to every verifier call.
    #[must_use]
    pub fn verifier_timeout(&self) -> Duration {
        self.verifier_timeout
    }

    /// Minimum wait between code deliveries to the same flow. Zero
    /// disables the cooldown.
    #[must_use]
    pub fn resend_cooldown(&self) -> Duration {
        self.resend_cooldown
    }

    /// Where a `ContactSupport` recovery should send the user. Overrides
    /// arrive as parsed [`Url`]s; unset, the built-in default applies.
    #[must_use]
    pub fn support_url(&self) -> &str {
        self.support_url
            .as_ref()
            .map_or(DEFAULT_SUPPORT_URL, Url::as_str)
    }

    /// Load configuration from environment variables, keeping defaults
    /// for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let verifier_timeout = std::env::var(ENV_VERIFIER_TIMEOUT_SECONDS)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
            .map_or_else(
                || Duration::from_secs(DEFAULT_VERIFIER_TIMEOUT_SECONDS),
                Duration::from_secs,
            );

        let resend_cooldown = std::env::var(ENV_RESEND_COOLDOWN_SECONDS)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map_or_else(
                || Duration::from_secs(DEFAULT_RESEND_COOLDOWN_SECONDS),
                Duration::from_secs,
            );

        let config = Self::new()
            .with_verifier_timeout(verifier_timeout)
            .with_resend_cooldown(resend_cooldown);

        match std::env::var(ENV_SUPPORT_URL)
            .ok()
            .and_then(|value| Url::parse(value.trim()).ok())
        {
            Some(support_url) => config.with_support_url(support_url),
            None => config,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = FlowConfig::new();
        assert_eq!(config.verifier_timeout(), Duration::from_secs(30));
        assert_eq!(config.resend_cooldown(), Duration::from_secs(60));
        assert_eq!(config.support_url(), "https://support.authflow.dev");
    }

    #[test]
    fn builders_override_defaults() {
        let config = FlowConfig::new()
            .with_verifier_timeout(Duration::from_secs(3))
            .with_resend_cooldown(Duration::ZERO)
            .with_support_url(Url::parse("https://help.example.com/auth").unwrap());

        assert_eq!(config.verifier_timeout(), Duration::from_secs(3));
        assert_eq!(config.resend_cooldown(), Duration::ZERO);
        assert_eq!(config.support_url(), "https://help.example.com/auth");
    }

    #[test]
    fn from_env_overrides_defaults() {
        temp_env::with_vars(
            [
                (ENV_VERIFIER_TIMEOUT_SECONDS, Some("5")),
                (ENV_RESEND_COOLDOWN_SECONDS, Some("0")),
                (ENV_SUPPORT_URL, Some("https://help.example.com/auth")),
            ],
            || {
                let config = FlowConfig::from_env();
                assert_eq!(config.verifier_timeout(), Duration::from_secs(5));
                assert_eq!(config.resend_cooldown(), Duration::ZERO);
                assert_eq!(config.support_url(), "https://help.example.com/auth");
            },
        );
    }

    #[test]
    fn from_env_keeps_defaults_for_invalid_values() {
        temp_env::with_vars(
            [
                (ENV_VERIFIER_TIMEOUT_SECONDS, Some("0")),
                (ENV_RESEND_COOLDOWN_SECONDS, Some("soon")),
                (ENV_SUPPORT_URL, Some("not a url")),
            ],
            || {
                let config = FlowConfig::from_env();
                assert_eq!(config.verifier_timeout(), Duration::from_secs(30));
                assert_eq!(config.resend_cooldown(), Duration::from_secs(60));
                assert_eq!(config.support_url(), "https://support.authflow.dev");
            },
        );
    }
}
