// Telemetry event types
//
// Event is the canonical, ordered telemetry record for a session.
// Heartbeat is a liveness signal outside the sequence-number stream.
// EventBatch is the unit of transmission to the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionStatus;

/// Canonical event types emitted by the pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StepStart,
    StepEnd,
    ToolCall,
    Error,
    /// Internal pipeline degradation (hook failure, malformed callback,
    /// dropped batch, queue eviction). Observable data loss, not host error.
    Degraded,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::StepStart => write!(f, "step_start"),
            EventType::StepEnd => write!(f, "step_end"),
            EventType::ToolCall => write!(f, "tool_call"),
            EventType::Error => write!(f, "error"),
            EventType::Degraded => write!(f, "degraded"),
        }
    }
}

/// Canonical telemetry record
///
/// `sequence_number` is monotonic per session, starts at 0, and is
/// gap-free for events actually enqueued regardless of which thread
/// produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub session_id: String,
    pub sequence_number: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    /// Bounded-size structured payload
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Liveness signal, independent of event traffic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub session_id: String,
    pub status: SessionStatus,
    pub timestamp: DateTime<Utc>,
}

impl Heartbeat {
    pub fn new(session_id: impl Into<String>, status: SessionStatus) -> Self {
        Self {
            session_id: session_id.into(),
            status,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered group of events for one session, the unit of transmission
///
/// Wire body for `POST /events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBatch {
    pub session_id: String,
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn new(session_id: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            session_id: session_id.into(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
