//! Cache sizing limits.

use thiserror::Error;

/// Largest body that will be cached (100 KB)
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 102_400;

/// Global byte budget for all cached bodies (~1 MB)
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1_049_000;

/// Ceiling on the number of cached entries
pub const DEFAULT_MAX_ENTRIES: usize = 4096;

/// Limits applied by the [`Cache`](crate::cache::Cache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Per-object cap in bytes; larger bodies are never cached
    pub max_object_size: usize,
    /// Global capacity in bytes across all entries
    pub max_cache_size: usize,
    /// Maximum number of entries regardless of their size
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    /// Checks that the limits are usable together.
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.max_object_size == 0 {
            return Err(CacheConfigError::ZeroObjectSize);
        }
        if self.max_entries == 0 {
            return Err(CacheConfigError::ZeroEntries);
        }
        if self.max_object_size > self.max_cache_size {
            return Err(CacheConfigError::ObjectLargerThanCache {
                object: self.max_object_size,
                cache: self.max_cache_size,
            });
        }
        Ok(())
    }
}

/// Invalid cache limits.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheConfigError {
    #[error("max object size must be greater than zero")]
    ZeroObjectSize,

    #[error("max entries must be greater than zero")]
    ZeroEntries,

    #[error("max object size ({object} bytes) exceeds cache size ({cache} bytes)")]
    ObjectLargerThanCache { object: usize, cache: usize },
}
