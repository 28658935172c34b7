//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{DEFAULT_CLEANUP_MAX_AGE_MS, DEFAULT_MEMO_TTL_MS};
use crate::queue::DEFAULT_FLUSH_DELAY_MS;
use crate::timing::DEFAULT_WAIT_MS;

/// Cache configuration parameters.
///
/// All durations are milliseconds. Every value can be configured via
/// environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Delay between the first queued write and the automatic flush
    pub flush_delay_ms: u64,
    /// Default TTL for memoized results
    pub memo_ttl_ms: u64,
    /// Interval of the automatic memo cleanup timer
    pub cleanup_interval_ms: u64,
    /// Age beyond which the automatic cleanup drops memo entries
    pub cleanup_max_age_ms: u64,
    /// Default quiet window for debounced callbacks
    pub debounce_wait_ms: u64,
    /// Path of the JSON file backing the session store
    pub store_path: String,
    /// Byte quota of the session store
    pub store_quota_bytes: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FLUSH_DELAY_MS` - Write queue flush delay (default: 100)
    /// - `MEMO_TTL_MS` - Memoization TTL (default: 3600000)
    /// - `CLEANUP_INTERVAL_MS` - Auto cleanup frequency (default: 300000)
    /// - `CLEANUP_MAX_AGE_MS` - Auto cleanup max entry age (default: 3600000)
    /// - `DEBOUNCE_WAIT_MS` - Debounce wait (default: 300)
    /// - `STORE_PATH` - Session store file (default: pilot_store.json)
    /// - `STORE_QUOTA_BYTES` - Session store quota (default: 5 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            flush_delay_ms: env_or("FLUSH_DELAY_MS", defaults.flush_delay_ms),
            memo_ttl_ms: env_or("MEMO_TTL_MS", defaults.memo_ttl_ms),
            cleanup_interval_ms: env_or("CLEANUP_INTERVAL_MS", defaults.cleanup_interval_ms),
            cleanup_max_age_ms: env_or("CLEANUP_MAX_AGE_MS", defaults.cleanup_max_age_ms),
            debounce_wait_ms: env_or("DEBOUNCE_WAIT_MS", defaults.debounce_wait_ms),
            store_path: env::var("STORE_PATH").unwrap_or(defaults.store_path),
            store_quota_bytes: env_or("STORE_QUOTA_BYTES", defaults.store_quota_bytes),
        }
    }

    pub fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.flush_delay_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn debounce_wait(&self) -> Duration {
        Duration::from_millis(self.debounce_wait_ms)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flush_delay_ms: DEFAULT_FLUSH_DELAY_MS,
            memo_ttl_ms: DEFAULT_MEMO_TTL_MS,
            cleanup_interval_ms: 300_000,
            cleanup_max_age_ms: DEFAULT_CLEANUP_MAX_AGE_MS,
            debounce_wait_ms: DEFAULT_WAIT_MS,
            store_path: "pilot_store.json".to_string(),
            store_quota_bytes: 5 * 1024 * 1024,
        }
    }
}
