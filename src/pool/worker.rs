//! Worker Pool
//!
//! A fixed set of long-lived workers, started once. Each worker loops
//! forever: take one connection from the queue, run a full proxy
//! transaction on it, close it, repeat.
//!
//! ## Worker Lifecycle
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │            Worker loop             │
//! │                                    │
//! │  pop() ──> Proxy::serve() ──> drop │
//! │    ▲                           │   │
//! │    └───────────────────────────┘   │
//! └────────────────────────────────────┘
//!          │ queue closed
//!          ▼
//!       worker exits
//! ```
//!
//! Transaction errors never leave `Proxy::serve`. A worker that panics
//! (for instance on a poisoned cache lock) is reported by
//! [`WorkerPool::wait`] so the process can stop instead of running on with
//! a torn cache.

use crate::pool::queue::QueueReceiver;
use crate::relay::{Connect, Proxy};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace};

/// An accepted client connection waiting for a worker.
#[derive(Debug)]
pub struct ClientConnection<S = TcpStream> {
    /// The client-facing stream, owned exclusively by one worker once dequeued
    pub stream: S,
    /// Client's address (for logging)
    pub peer: SocketAddr,
}

impl<S> ClientConnection<S> {
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }
}

/// Errors surfaced by the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A worker panicked; shared state may be inconsistent
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

/// The running set of workers.
///
/// Dropping the pool aborts every worker.
#[derive(Debug)]
pub struct WorkerPool {
    workers: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    /// Starts `size` workers consuming `queue` and serving with `proxy`.
    pub fn start<C, S>(
        size: usize,
        queue: QueueReceiver<ClientConnection<S>>,
        proxy: Arc<Proxy<C>>,
    ) -> Self
    where
        C: Connect,
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut workers = JoinSet::new();
        for id in 0..size {
            workers.spawn(worker_loop(id, queue.clone(), Arc::clone(&proxy)));
        }

        info!(workers = size, "Worker pool started");
        Self { workers, size }
    }

    /// Number of workers the pool was started with.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Waits until every worker has exited.
    ///
    /// Workers only exit once the queue is closed, so under normal operation
    /// this never returns `Ok`. It returns an error as soon as any worker
    /// panics.
    pub async fn wait(&mut self) -> Result<(), PoolError> {
        while let Some(result) = self.workers.join_next().await {
            match result {
                Ok(()) => {}
                Err(e) if e.is_panic() => {
                    error!(error = %e, "Worker panicked");
                    return Err(PoolError::WorkerPanicked(e.to_string()));
                }
                Err(e) => debug!(error = %e, "Worker cancelled"),
            }
        }
        Ok(())
    }

    /// Aborts every worker, dropping whatever connections they hold.
    pub fn shutdown(&mut self) {
        self.workers.abort_all();
        info!("Worker pool stopped");
    }
}

/// The per-worker loop: dequeue, serve, close, repeat.
async fn worker_loop<C, S>(
    id: usize,
    queue: QueueReceiver<ClientConnection<S>>,
    proxy: Arc<Proxy<C>>,
) where
    C: Connect,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    debug!(worker = id, "Worker started");

    while let Some(conn) = queue.pop().await {
        trace!(worker = id, client = %conn.peer, "Dequeued connection");
        proxy.serve(conn.stream, conn.peer).await;
    }

    debug!(worker = id, "Connection queue closed, worker exiting");
}
