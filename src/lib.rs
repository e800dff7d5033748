//! # proxycache - A Caching HTTP Forward Proxy
//!
//! proxycache accepts HTTP requests from clients, relays them to origin
//! servers, streams the responses back, and keeps complete response bodies
//! in an in-memory LRU cache so repeated requests never reach the origin.
//!
//! ## Features
//!
//! - **Header Rewriting**: connection headers forced to `close`, identifying
//!   headers stripped, requests downgraded to HTTP/1.0
//! - **LRU Cache**: strict least-recently-used eviction under a global byte
//!   budget and a per-object cap
//! - **Bounded Worker Pool**: a fixed set of workers fed by a bounded queue
//!   that pushes back on the acceptor when full
//! - **Async I/O**: Built on Tokio
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              proxycache                                 │
//! │                                                                         │
//! │  ┌─────────────┐    ┌──────────────┐    ┌───────────────────────────┐   │
//! │  │ TCP Server  │───>│  Connection  │───>│ Worker Pool (N workers)   │   │
//! │  │ (Acceptor)  │    │    Queue     │    │   each runs Proxy::serve  │   │
//! │  └─────────────┘    └──────────────┘    └─────────────┬─────────────┘   │
//! │                                                       │                 │
//! │                          ┌────────────────────────────┼──────────┐      │
//! │                          ▼                            ▼          ▼      │
//! │                  ┌──────────────┐            ┌─────────────┐  origin    │
//! │                  │   Request    │            │    Cache    │  servers   │
//! │                  │   Parser     │            │ RwLock<LRU> │            │
//! │                  └──────────────┘            └─────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use proxycache::cache::Cache;
//! use proxycache::pool::{connection_queue, ClientConnection, WorkerPool};
//! use proxycache::relay::Proxy;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Arc::new(Cache::new());
//!     let proxy = Arc::new(Proxy::new(cache));
//!
//!     let (queue, receiver) = connection_queue(16);
//!     let _pool = WorkerPool::start(8, receiver, proxy);
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         queue.push(ClientConnection::new(stream, addr)).await.unwrap();
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: request line, URI and header parsing
//! - [`cache`]: the concurrent LRU object cache
//! - [`relay`]: the per-connection request/response relay
//! - [`pool`]: the bounded connection queue and worker pool
//! - [`config`]: startup settings
//!
//! ## Design Highlights
//!
//! ### Close-Delimited Relay
//!
//! Every request reaches the origin as HTTP/1.0 with `Connection: close`,
//! so the response body simply runs until the origin hangs up. The relay
//! never needs to understand `Content-Length` or chunked encoding.
//!
//! ### Tolerant Promotion
//!
//! Cache lookups answer misses under the read lock and only take the write
//! lock to promote a hit. An entry evicted between the two steps is a miss.
//!
//! ### Backpressure
//!
//! When every worker is busy and the queue is full, the acceptor waits.
//! Nothing is buffered without bound.

pub mod cache;
pub mod config;
pub mod pool;
pub mod protocol;
pub mod relay;

// Re-export commonly used types for convenience
pub use cache::{Cache, CacheConfig};
pub use config::{ConfigError, ProxyConfig};
pub use pool::{connection_queue, ClientConnection, WorkerPool};
pub use protocol::{ParseError, Request};
pub use relay::{Proxy, RelayError};

/// The default port proxycache listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host proxycache binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of proxycache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
