//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in seconds for entries stored without an explicit TTL
    pub default_ttl: u64,
    /// TTL in seconds for cached pages
    pub pagination_ttl: u64,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
    /// Page size used when a paginator does not ask for one
    pub default_page_limit: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `PAGINATION_TTL` - Page TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `DEFAULT_PAGE_LIMIT` - Default page size (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            pagination_ttl: env_or("PAGINATION_TTL", defaults.pagination_ttl),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            default_page_limit: env_or("DEFAULT_PAGE_LIMIT", defaults.default_page_limit)
                .max(1),
        }
    }

    /// Default entry TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    /// Page TTL as a `Duration`.
    pub fn pagination_ttl(&self) -> Duration {
        Duration::from_secs(self.pagination_ttl)
    }

    /// Sweep interval as a `Duration`.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            pagination_ttl: 300,
            cleanup_interval: 60,
            default_page_limit: 10,
        }
    }
}

fn env_or(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
