//! Bounded Connection Queue
//!
//! The hand-off point between the acceptor and the workers. It is a bounded
//! FIFO: `push` waits while the queue is full and `pop` waits while it is
//! empty. Neither side has a timeout, so a stalled pool stalls the acceptor.
//!
//! ```text
//!                 ┌───┬───┬───┬───┬───┐
//!  acceptor ────> │ 4 │ 3 │ 2 │   │   │ ────> worker 0 .. worker N
//!    push()       └───┴───┴───┴───┴───┘         pop()
//!   (waits when      capacity = 5           (waits when empty;
//!      full)                                 one worker at a time)
//! ```
//!
//! The receiving end is shared by all workers behind an async mutex. The
//! mutex is fair, so idle workers are handed connections in the order they
//! started waiting.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Returned by [`QueueSender::push`] once every receiver is gone.
///
/// The rejected item is dropped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("connection queue closed")]
pub struct QueueClosed;

/// Producer half of the queue, held by the acceptor.
#[derive(Debug)]
pub struct QueueSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Consumer half of the queue, cloned into every worker.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

/// Creates a bounded connection queue.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn connection_queue<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        QueueSender { tx },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

impl<T> QueueSender<T> {
    /// Appends an item, waiting while the queue is full.
    pub async fn push(&self, item: T) -> Result<(), QueueClosed> {
        self.tx.send(item).await.map_err(|_| QueueClosed)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Returns true if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued items.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Returns true once every receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> QueueReceiver<T> {
    /// Removes the oldest item, waiting while the queue is empty.
    ///
    /// Returns `None` once every sender is dropped and the queue is drained.
    pub async fn pop(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}
