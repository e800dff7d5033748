//! Response Cache Module
//!
//! This module provides the in-memory object cache consulted by every
//! worker before contacting an origin.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Cache                              │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │                    RwLock<LruList>                    │  │
//! │  │   index: uri -> slot     head ⇄ ... ⇄ tail            │  │
//! │  │   total_size             slots[] + free list          │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!        ▲ lookup (read, then write to promote)
//!        │ insert (write; evict tail until it fits)
//!   Worker 0 .. Worker N
//! ```
//!
//! ## Features
//!
//! - **Strict LRU**: eviction always takes the least recently used entry
//! - **Byte Budget**: the sum of cached sizes never exceeds the capacity
//! - **Per-Object Cap**: oversized bodies are skipped, never truncated
//! - **No Expiry**: entries leave only through eviction
//!
//! ## Example
//!
//! ```
//! use proxycache::cache::Cache;
//! use bytes::Bytes;
//!
//! let cache = Cache::new();
//! cache.insert("http://example.com/a.html", Bytes::from("hello"));
//!
//! assert_eq!(cache.lookup("http://example.com/a.html"), Some(Bytes::from("hello")));
//! assert_eq!(cache.total_size(), 5);
//! ```

pub mod config;
pub mod lru;

// Re-export commonly used types
pub use config::{CacheConfig, CacheConfigError};
pub use lru::{Cache, CacheEntry, CacheStats, InsertOutcome};
