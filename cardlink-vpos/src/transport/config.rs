//! Transport configuration types.
//!
//! This module defines the TOML-deserializable `[transport]` section.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{PaymentError, Result};

/// HTTP transport configuration.
///
/// The gateway can take a long time to answer a settlement request, so the
/// defaults are generous: 120 seconds per request and 45 seconds to connect.
///
/// # Examples
///
/// ```toml
/// [transport]
/// timeout_secs = 120
/// connect_timeout_secs = 45
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum idle connections per host.
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_max_idle_per_host: default_pool_max_idle(),
        }
    }
}

impl HttpConfig {
    /// Validates configuration values are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Config`] if either timeout is outside 1-300 seconds.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(PaymentError::Config("timeout_secs must be between 1 and 300".to_owned()));
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 300 {
            return Err(PaymentError::Config(
                "connect_timeout_secs must be between 1 and 300".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns connect timeout as Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    45
}

fn default_pool_max_idle() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.connect_timeout_secs, 45);
        assert_eq!(config.pool_max_idle_per_host, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_config_durations() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.connect_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_http_config_with_defaults() {
        let toml = "
            timeout_secs = 60
        ";

        let config: HttpConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.connect_timeout_secs, 45); // default
    }

    #[test]
    fn test_http_config_zero_timeout_rejected() {
        let config = HttpConfig { timeout_secs: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_http_config_connect_timeout_upper_bound() {
        let ok = HttpConfig { connect_timeout_secs: 300, ..Default::default() };
        assert!(ok.validate().is_ok());

        let too_long = HttpConfig { connect_timeout_secs: 301, ..Default::default() };
        let err = too_long.validate().unwrap_err();
        assert!(err.to_string().contains("connect_timeout_secs"));
    }
}
