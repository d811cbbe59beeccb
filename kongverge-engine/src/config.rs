//! Process-wide engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::MAX_PAGE_SIZE;
use crate::retry::RetryPolicy;

pub const DEFAULT_RETRY_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("retry timeout must be greater than zero")]
    ZeroRetryTimeout,

    #[error("page size must be between 1 and {max}, got {got}")]
    PageSize { got: usize, max: usize },
}

/// Settings shared by every reconciliation call. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Adopt an existing resource when create hits a unique constraint.
    pub upsert_resources: bool,
    /// Retry failed creates until the retry timeout elapses.
    pub retry_on_error: bool,
    /// Total time budget for a create, in seconds.
    pub retry_timeout_secs: u64,
    /// Track plugin config strictly unless an instance overrides it.
    pub strict_plugins_match: bool,
    /// Page size used for adoption scans.
    pub page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            upsert_resources: false,
            retry_on_error: false,
            retry_timeout_secs: DEFAULT_RETRY_TIMEOUT_SECS,
            strict_plugins_match: false,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout_secs)
    }

    /// Fresh retry policy for one reconciliation call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_timeout(), self.retry_on_error)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_timeout_secs == 0 {
            return Err(ConfigError::ZeroRetryTimeout);
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::PageSize {
                got: self.page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.upsert_resources);
        assert!(!config.retry_on_error);
        assert_eq!(config.retry_timeout(), Duration::from_secs(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"upsert_resources": true}"#).unwrap();
        assert!(config.upsert_resources);
        assert_eq!(config.retry_timeout_secs, DEFAULT_RETRY_TIMEOUT_SECS);
    }

    #[test]
    fn test_validate_rejects_zero_timeout_and_bad_page_size() {
        let config = EngineConfig {
            retry_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRetryTimeout));

        let config = EngineConfig {
            page_size: 5000,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::PageSize { .. })));
    }
}
