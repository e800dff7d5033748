//! Proxy Relay Module
//!
//! This module runs the per-connection proxy transaction: it resolves the
//! client's request, consults the shared cache, and on a miss relays the
//! request to the origin and streams the response back.
//!
//! ## Architecture
//!
//! ```text
//!  client ──request──> ┌──────────────┐ ──filtered request──> origin
//!                      │    Proxy     │
//!  client <─response── │  (handler)   │ <──────response─────── origin
//!                      └──────┬───────┘
//!                             │ lookup / insert
//!                             ▼
//!                      ┌──────────────┐
//!                      │    Cache     │
//!                      └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - `handler`: the transaction state machine and its error type
//! - `filter`: which request headers reach the origin, and how
//! - `connector`: the origin connection seam
//!
//! ## Example
//!
//! ```ignore
//! use proxycache::cache::Cache;
//! use proxycache::relay::Proxy;
//! use std::sync::Arc;
//!
//! let proxy = Proxy::new(Arc::new(Cache::new()));
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! proxy.serve(stream, addr).await;
//! ```

pub mod connector;
pub mod filter;
pub mod handler;

// Re-export commonly used types
pub use connector::{Connect, TcpConnector};
pub use filter::{filter_request_headers, forward_header, render_origin_request};
pub use handler::{Outcome, Proxy, ProxyStats, RelayError, RELAY_CHUNK_SIZE};
