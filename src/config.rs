//! Proxy configuration.
//!
//! Defaults: 8 workers, a 16-slot connection queue, a 100 KB object cap
//! and a ~1 MB cache.

use crate::cache::{CacheConfig, CacheConfigError};
use thiserror::Error;

/// Default number of workers
pub const DEFAULT_WORKERS: usize = 8;

/// Default connection queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Everything needed to start the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Number of workers in the pool
    pub workers: usize,
    /// Slots in the connection queue
    pub queue_capacity: usize,
    /// Cache limits
    pub cache: CacheConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            cache: CacheConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Checks that the proxy can start with these settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        self.cache.validate()?;
        Ok(())
    }
}

/// Invalid proxy settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one worker is required")]
    NoWorkers,

    #[error("connection queue capacity must be greater than zero")]
    ZeroQueueCapacity,

    #[error("invalid cache limits: {0}")]
    Cache(#[from] CacheConfigError),
}
