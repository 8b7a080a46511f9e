//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, RequestDelay};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `proxy_pool` contains an empty entry
    /// - `request_delay_ms` is a range with min > max
    /// - `retry_max_delay_ms` is below `retry_delay_ms`
    /// - `cache_expires_secs` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid {
                field: "user_agent".into(),
                reason: "must not be empty".into(),
            });
        }

        if self.proxy_pool.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::Invalid {
                field: "proxy_pool".into(),
                reason: "entries must not be empty".into(),
            });
        }

        if let RequestDelay::Range(min, max) = self.request_delay_ms
            && min > max
        {
            return Err(ConfigError::Invalid {
                field: "request_delay_ms".into(),
                reason: format!("range min {min} exceeds max {max}"),
            });
        }

        if self.retry_max_delay_ms < self.retry_delay_ms {
            return Err(ConfigError::Invalid {
                field: "retry_max_delay_ms".into(),
                reason: "must not be below retry_delay_ms".into(),
            });
        }

        if self.cache_expires_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "cache_expires_secs".into(),
                reason: "must be positive; omit for no expiration".into(),
            });
        }

        if !self.enable_proxy && !self.proxy_pool.is_empty() {
            tracing::warn!(
                pool_size = self.proxy_pool.len(),
                "proxy_pool is configured but enable_proxy is false; \
                 all requests will go direct"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_empty_proxy_entry() {
        let config = AppConfig { proxy_pool: vec!["".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "proxy_pool"));
    }

    #[test]
    fn test_validate_inverted_delay_range() {
        let config =
            AppConfig { request_delay_ms: RequestDelay::Range(10, 5), ..Default::default() };
        let result = config.validate();
        assert!(
            matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "request_delay_ms")
        );
    }

    #[test]
    fn test_validate_max_delay_below_base() {
        let config = AppConfig {
            retry_delay_ms: 2_000,
            retry_max_delay_ms: 1_000,
            ..Default::default()
        };
        let result = config.validate();
        assert!(
            matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "retry_max_delay_ms")
        );
    }

    #[test]
    fn test_validate_zero_expiry() {
        let config = AppConfig { cache_expires_secs: Some(0), ..Default::default() };
        let result = config.validate();
        assert!(
            matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_expires_secs")
        );
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { timeout_ms: 100, cache_expires_secs: Some(1), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
