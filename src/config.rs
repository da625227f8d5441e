//! Runtime settings for the finder: worker count, request timeout, user agent

use crate::error::{FinderError, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the worker count
pub const WORKERS_ENV: &str = "TAG_FINDER_WORKERS";
/// Environment variable overriding the per-request timeout, in seconds
pub const TIMEOUT_ENV: &str = "TAG_FINDER_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderConfig {
    /// Number of concurrent manifest lookups
    pub workers: usize,
    /// Per-request timeout for every registry and token call
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("docker-tag-finder/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FinderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `TAG_FINDER_WORKERS` / `TAG_FINDER_TIMEOUT`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workers) = lookup(WORKERS_ENV) {
            let workers = workers.trim().parse::<usize>().map_err(|_| {
                FinderError::Config(format!("{} must be a positive integer, got '{}'", WORKERS_ENV, workers))
            })?;
            config.workers = workers;
        }

        if let Some(timeout) = lookup(TIMEOUT_ENV) {
            let secs = timeout.trim().parse::<u64>().map_err(|_| {
                FinderError::Config(format!("{} must be a number of seconds, got '{}'", TIMEOUT_ENV, timeout))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(FinderError::Config("workers must be at least 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(FinderError::Config("timeout must be greater than 0".to_string()));
        }
        Ok(())
    }
}
