//! Bounded single-direction message queue.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-capacity FIFO between exactly one producer and one consumer thread.
///
/// Overflow drops the newest message: `push` fails fast and bumps a counter,
/// nothing blocks and nothing already queued is discarded.
pub struct MessageQueue<T> {
    name: &'static str,
    queue: ArrayQueue<T>,
    dropped: AtomicU64,
}

impl<T> MessageQueue<T> {
    /// # Panics
    ///
    /// If `capacity` is zero (rejected earlier by `PluginConfig::validate`).
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            queue: ArrayQueue::new(capacity),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Never blocks or allocates. On overflow the message is handed back.
    pub fn push(&self, msg: T) -> Result<(), T> {
        self.queue.push(msg).inspect_err(|_| {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        })
    }

    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Deliver every queued message in FIFO order.
    ///
    /// Everything present when the call starts is delivered. Delivery stops
    /// after `capacity` messages so a producer that keeps pushing cannot hold
    /// the consumer here indefinitely.
    pub fn drain(&self, mut handler: impl FnMut(T)) -> usize {
        let limit = self.queue.capacity();
        let mut count = 0;
        while count < limit {
            match self.queue.pop() {
                Some(msg) => {
                    handler(msg);
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Messages rejected because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}
