//! Client configuration.

use std::time::Duration;

/// Configuration for the client's endpoints and reconnect policy.
///
/// The defaults point at the live service; tests override
/// `gateway_url` and the API bases to talk to in-process mocks.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API base URL (no trailing slash).
    pub api_base: String,

    /// OAuth2 API base URL, used for the application lookup.
    pub oauth_base: String,

    /// Explicit gateway URL. When set, the REST gateway lookup is
    /// skipped entirely.
    pub gateway_url: Option<String>,

    /// How many consecutive failed connection attempts to tolerate
    /// before `run` gives up.
    pub max_reconnect_attempts: u32,

    /// Backoff before the first retry; doubled per consecutive failure.
    pub reconnect_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
            oauth_base: "https://discord.com/api/oauth2".to_string(),
            gateway_url: None,
            max_reconnect_attempts: 5,
            reconnect_backoff: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Backoff before retry number `attempt` (1-based), doubling per
    /// consecutive failure. The exponent is capped so the duration
    /// arithmetic cannot overflow.
    pub(crate) fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.reconnect_backoff * (1u32 << exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_live_service() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base, "https://discord.com/api/v10");
        assert_eq!(config.oauth_base, "https://discord.com/api/oauth2");
        assert!(config.gateway_url.is_none());
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let config = ClientConfig {
            reconnect_backoff: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
        // Capped exponent, not an overflow.
        assert_eq!(config.backoff_for(60), Duration::from_millis(100) * (1 << 16));
    }
}
