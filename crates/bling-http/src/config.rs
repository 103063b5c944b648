//! Settings for the default transport and the facade's retry policy

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How [`Bling::with_config`](crate::Bling::with_config) builds its transport
///
/// Every field is optional when deserializing; missing ones take the value
/// from [`BlingConfig::default`]. The retry fields seed
/// [`RetryPolicy::from_config`](crate::RetryPolicy::from_config) and leave
/// retries off unless `retry_count` is raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlingConfig {
    /// Upper bound for a whole exchange on the reqwest client
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Retries after the first attempt, 0 disables them
    pub retry_count: u32,
    /// First backoff step, doubled on every further retry
    pub retry_delay: Duration,
    /// Proxy applied to every scheme
    pub proxy: Option<String>,
    pub user_agent: String,
    /// Redirect hops followed before giving up, 0 returns the 3xx as-is
    pub max_redirects: usize,
}

impl Default for BlingConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry_count: 0,
            retry_delay: Duration::from_millis(500),
            proxy: None,
            user_agent: concat!("bling/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
        }
    }
}

impl BlingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tight deadlines for calls where a slow answer is as bad as none
    pub fn fast() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }

    /// Room for uploads and slow endpoints; transient failures are retried twice
    pub fn long() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(15),
            retry_count: 2,
            retry_delay: Duration::from_secs(1),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Route all traffic through `proxy`; validated when the client is built
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_does_not_retry() {
        let config = BlingConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_count, 0);
        assert!(config.user_agent.starts_with("bling/"));
    }

    #[test]
    fn test_presets() {
        let fast = BlingConfig::fast();
        assert_eq!(fast.timeout, Duration::from_secs(5));
        assert_eq!(fast.retry_count, 0);

        let long = BlingConfig::long();
        assert_eq!(long.timeout, Duration::from_secs(120));
        assert_eq!(long.retry_count, 2);
        assert_eq!(long.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_setters_chain() {
        let config = BlingConfig::new()
            .with_timeout(Duration::from_secs(15))
            .with_retry_count(5)
            .with_max_redirects(0)
            .with_proxy("http://proxy.example.com:8080");

        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.retry_count, 5);
        assert_eq!(config.max_redirects, 0);
        assert_eq!(config.proxy.as_deref(), Some("http://proxy.example.com:8080"));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: BlingConfig =
            serde_json::from_str(r#"{"retry_count": 2, "user_agent": "agent/1.0"}"#).unwrap();
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.user_agent, "agent/1.0");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 10);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_serde_round_trip_keeps_everything() {
        let config = BlingConfig::long().with_proxy("http://proxy.local:3128");
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<BlingConfig>(&json).unwrap(), config);
    }
}
