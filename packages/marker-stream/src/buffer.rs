// Lock-free ring buffer for inbound samples
//
// Backs the per-connection sample queue of the simulated transport. When the
// producer outruns the reader the oldest sample is overwritten, the way a
// transport-side inlet buffer behaves.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bounded queue that overwrites its oldest item when full
pub struct CircularBuffer<T> {
    buffer: ArrayQueue<T>,
    overwritten: AtomicU64,
}

impl<T> CircularBuffer<T> {
    /// Create a buffer holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: ArrayQueue::new(capacity.max(1)),
            overwritten: AtomicU64::new(0),
        }
    }

    /// Push an item, evicting the oldest one if the buffer is full
    ///
    /// Returns true if an item was overwritten.
    pub fn push(&self, item: T) -> bool {
        let evicted = self.buffer.force_push(item).is_some();
        if evicted {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    /// Pop the oldest item
    pub fn pop(&self) -> Option<T> {
        self.buffer.pop()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Items lost to overwrites since creation
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }

    /// Clear all items from buffer
    pub fn clear(&self) {
        while self.buffer.pop().is_some() {}
    }
}
