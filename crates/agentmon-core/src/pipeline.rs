// Ingest path shared by hooks, the monitor handle, and the transport
//
// EventSink is the single place events enter the queue. A short gate
// serializes sequence assignment with enqueue so queue order equals
// sequence order even when hooks fire from many host threads. Nothing
// here suspends or returns an error into the caller.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::Notify;

use agentmon_contracts::{Event, EventType, RawCallback};

use crate::normalize::Normalizer;
use crate::queue::DeliveryQueue;
use crate::session::SessionState;

pub struct EventSink {
    session: Arc<SessionState>,
    queue: Arc<DeliveryQueue>,
    normalizer: Normalizer,
    /// Serializes sequence assignment + enqueue; hold time is O(1)
    gate: Mutex<()>,
    /// Wakes the transport worker when a full batch is waiting
    nudge: Arc<Notify>,
    batch_size: usize,
}

impl EventSink {
    pub fn new(
        session: Arc<SessionState>,
        queue: Arc<DeliveryQueue>,
        normalizer: Normalizer,
        nudge: Arc<Notify>,
        batch_size: usize,
    ) -> Self {
        Self {
            session,
            queue,
            normalizer,
            gate: Mutex::new(()),
            nudge,
            batch_size,
        }
    }

    /// Normalize and enqueue one observed callback
    pub fn ingest(&self, raw: RawCallback) {
        let _gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        let event = self.normalizer.normalize(raw, &self.session);
        self.queue.push(event);
        drop(_gate);

        if self.queue.len() >= self.batch_size {
            self.nudge.notify_one();
        }
    }

    /// Enqueue a pipeline diagnostic as a degraded event
    ///
    /// Used for detection ambiguity, queue overflow reports, and dropped
    /// batches; skips normalization since the fields are pipeline-owned.
    pub fn diagnostic(&self, reason: &str, mut fields: serde_json::Map<String, serde_json::Value>) {
        fields.insert(
            "reason".to_string(),
            serde_json::Value::String(reason.to_string()),
        );

        let _gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        let event = Event {
            session_id: self.session.session_id().to_string(),
            sequence_number: self.session.next_sequence(),
            event_type: EventType::Degraded,
            timestamp: Utc::now(),
            payload: fields,
        };
        self.queue.push(event);
    }
}
