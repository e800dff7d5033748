//! Connection Dispatch Module
//!
//! This module links the acceptor to a fixed set of workers through a
//! bounded queue.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   push    ┌──────────────────┐   pop    ┌──────────┐
//! │   Acceptor   │ ────────> │ Connection Queue │ ───────> │ Worker 0 │
//! │  (main.rs)   │  (waits   │   (bounded FIFO) │ (waits   │ Worker 1 │
//! └──────────────┘  if full) └──────────────────┘ if empty)│   ...    │
//!                                                          │ Worker N │
//!                                                          └────┬─────┘
//!                                                               │
//!                                                      Proxy::serve()
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use proxycache::pool::{connection_queue, ClientConnection, WorkerPool};
//!
//! let (queue, receiver) = connection_queue(16);
//! let mut pool = WorkerPool::start(8, receiver, proxy);
//!
//! loop {
//!     let (stream, addr) = listener.accept().await?;
//!     queue.push(ClientConnection::new(stream, addr)).await?;
//! }
//! ```

pub mod queue;
pub mod worker;

// Re-export commonly used types
pub use queue::{connection_queue, QueueClosed, QueueReceiver, QueueSender};
pub use worker::{ClientConnection, PoolError, WorkerPool};
