//! Handoff queue between the receive thread and the host
//!
//! Unbounded multi-producer multi-consumer FIFO of decoded payload text.
//! Pushing never blocks or fails; there is no back-pressure, so a stalled
//! consumer lets the queue grow without limit.

use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Thread-safe FIFO of payload strings
#[derive(Default)]
pub struct HandoffQueue {
    queue: SegQueue<String>,
    pushed: AtomicU64,
    popped: AtomicU64,
}

impl HandoffQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload
    pub fn push(&self, payload: String) {
        self.queue.push(payload);
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove the oldest payload
    pub fn pop(&self) -> Option<String> {
        let item = self.queue.pop();
        if item.is_some() {
            self.popped.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    /// Remove every payload queued at the time of the call, oldest first.
    ///
    /// Payloads pushed while draining are left for the next call.
    pub fn drain(&self) -> Vec<String> {
        let pending = self.queue.len();
        let mut items = Vec::with_capacity(pending);
        while items.len() < pending {
            match self.queue.pop() {
                Some(item) => items.push(item),
                None => break,
            }
        }
        self.popped.fetch_add(items.len() as u64, Ordering::Relaxed);
        items
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total payloads ever pushed
    pub fn pushed_count(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Total payloads ever removed
    pub fn popped_count(&self) -> u64 {
        self.popped.load(Ordering::Relaxed)
    }
}

/// Thread-safe handle to a handoff queue
pub type SharedHandoffQueue = Arc<HandoffQueue>;

/// Create a new shared handoff queue
pub fn create_shared_queue() -> SharedHandoffQueue {
    Arc::new(HandoffQueue::new())
}
