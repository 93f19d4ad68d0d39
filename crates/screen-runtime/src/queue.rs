//! Bounded, never-blocking delivery queues.
//!
//! Price data is perishable: when a consumer falls behind, the newest value
//! is simply not queued rather than stalling the producer. Every drop is
//! counted so the loss stays observable.
//!
//! Nothing already queued is ever evicted: "latest wins" means the next value
//! offered after the consumer drains the queue reaches it, not that a new value
//! overwrites the one already waiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Outcome of [`BoundedSender::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// The item was queued.
    Delivered,
    /// The queue was full; the item was discarded. Carries the running total.
    Dropped { total: u64 },
    /// The receiver is gone; the item was discarded.
    Closed,
}

/// Shared count of items discarded because a queue was full.
#[derive(Debug, Clone, Default)]
pub struct DropCounter(Arc<AtomicU64>);

impl DropCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Producer side of a bounded queue with a try-send-only API.
#[derive(Debug)]
pub struct BoundedSender<T> {
    tx: mpsc::Sender<T>,
    dropped: DropCounter,
}

impl<T> Clone for BoundedSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            dropped: self.dropped.clone(),
        }
    }
}

impl<T> BoundedSender<T> {
    /// Queue `item` if there is room, otherwise discard it. Never waits.
    pub fn offer(&self, item: T) -> Offer {
        match self.tx.try_send(item) {
            Ok(()) => Offer::Delivered,
            Err(TrySendError::Full(_)) => Offer::Dropped {
                total: self.dropped.increment(),
            },
            Err(TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    pub fn drop_counter(&self) -> DropCounter {
        self.dropped.clone()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Create a bounded queue holding at most `capacity` items (minimum 1).
pub fn bounded<T>(capacity: usize) -> (BoundedSender<T>, mpsc::Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        BoundedSender {
            tx,
            dropped: DropCounter::default(),
        },
        rx,
    )
}

/// A receiver whose channel is already closed and empty.
pub fn closed<T>() -> mpsc::Receiver<T> {
    let (_, rx) = mpsc::channel(1);
    rx
}
