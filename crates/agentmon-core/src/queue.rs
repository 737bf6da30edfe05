// Bounded per-session delivery queue
//
// Enqueue is non-blocking: the critical section is O(1) and a full queue
// evicts the oldest entry rather than waiting. Evictions are counted so
// data loss stays observable; the transport worker surfaces the counter
// as a degraded event.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use agentmon_contracts::Event;

/// Bounded FIFO of events awaiting transmission
pub struct DeliveryQueue {
    inner: Mutex<VecDeque<Event>>,
    cap: usize,
    evicted: AtomicU64,
}

impl DeliveryQueue {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap.min(1024))),
            cap,
            evicted: AtomicU64::new(0),
        }
    }

    /// Append an event, evicting the oldest entry when full
    pub fn push(&self, event: Event) {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= self.cap {
            queue.pop_front();
            self.evicted.fetch_add(1, Ordering::AcqRel);
        }
        queue.push_back(event);
    }

    /// Put a failed batch back at the front, preserving its order
    ///
    /// Subject to the same capacity policy: if the queue overflows, the
    /// oldest entries (the front of the restored batch) are evicted.
    pub fn requeue_front(&self, events: Vec<Event>) {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for event in events.into_iter().rev() {
            queue.push_front(event);
        }
        while queue.len() > self.cap {
            queue.pop_front();
            self.evicted.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Drain the next batch, bounded by event count and serialized bytes
    ///
    /// Always returns at least one event when the queue is non-empty, even
    /// if that single event exceeds the byte budget.
    pub fn next_batch(&self, max_events: usize, max_bytes: usize) -> Vec<Event> {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut batch = Vec::new();
        let mut bytes = 0usize;

        while batch.len() < max_events {
            let Some(event) = queue.front() else { break };
            let size = serde_json::to_vec(event).map(|v| v.len()).unwrap_or(0);
            if !batch.is_empty() && bytes + size > max_bytes {
                break;
            }
            bytes += size;
            // front() just succeeded, pop cannot fail
            if let Some(event) = queue.pop_front() {
                batch.push(event);
            }
        }

        batch
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total events evicted since creation
    pub fn evictions(&self) -> u64 {
        self.evicted.load(Ordering::Acquire)
    }
}
