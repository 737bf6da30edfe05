// Shared per-session runtime state
//
// One SessionState is shared between the hook path, the transport worker,
// and the heartbeat ticker. Everything here is lock-free or O(1) under a
// lock so hook threads never stall on it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::RwLock;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::debug;

use agentmon_contracts::{Session, SessionStatus};

fn status_to_u8(status: SessionStatus) -> u8 {
    match status {
        SessionStatus::Starting => 0,
        SessionStatus::Running => 1,
        SessionStatus::Idle => 2,
        SessionStatus::Errored => 3,
        SessionStatus::Stopped => 4,
    }
}

fn status_from_u8(value: u8) -> SessionStatus {
    match value {
        1 => SessionStatus::Running,
        2 => SessionStatus::Idle,
        3 => SessionStatus::Errored,
        4 => SessionStatus::Stopped,
        _ => SessionStatus::Starting,
    }
}

/// Mutable state for one monitored session
pub struct SessionState {
    session_id: String,
    started_at: DateTime<Utc>,
    status: AtomicU8,
    /// Next sequence number; contended across hook threads
    sequence: AtomicU64,
    /// Events dropped from rejected batches
    dropped_events: AtomicU64,
    /// Set once the collector rejects our credentials
    delivery_halted: AtomicBool,
    /// Start of the current run of transient failures
    failing_since: RwLock<Option<Instant>>,
    metadata: RwLock<HashMap<String, serde_json::Value>>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: Utc::now(),
            status: AtomicU8::new(status_to_u8(SessionStatus::Starting)),
            sequence: AtomicU64::new(0),
            dropped_events: AtomicU64::new(0),
            delivery_halted: AtomicBool::new(false),
            failing_since: RwLock::new(None),
            metadata: RwLock::new(HashMap::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        status_from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: SessionStatus) {
        let previous = status_from_u8(self.status.swap(status_to_u8(status), Ordering::AcqRel));
        if previous != status {
            debug!(
                session_id = %self.session_id,
                from = %previous,
                to = %status,
                "session status changed"
            );
        }
    }

    /// Claim the next sequence number (monotonic, starts at 0)
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::AcqRel)
    }

    pub fn record_dropped(&self, count: u64) {
        self.dropped_events.fetch_add(count, Ordering::AcqRel);
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Acquire)
    }

    /// Halt delivery after an auth rejection; returns true on the first call
    pub fn halt_delivery(&self) -> bool {
        !self.delivery_halted.swap(true, Ordering::AcqRel)
    }

    pub fn is_delivery_halted(&self) -> bool {
        self.delivery_halted.load(Ordering::Acquire)
    }

    /// Note a transient failure; returns true once the failure window is exceeded
    pub fn note_transient_failure(&self, window: std::time::Duration) -> bool {
        let mut failing = self
            .failing_since
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let since = failing.get_or_insert_with(Instant::now);
        since.elapsed() >= window
    }

    /// Clear the failure window after a successful delivery
    pub fn note_delivery_success(&self) {
        let mut failing = self
            .failing_since
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *failing = None;
    }

    pub fn insert_metadata(&self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value);
    }

    /// Snapshot the session entity for reporting
    pub fn snapshot(&self) -> Session {
        Session {
            session_id: self.session_id.clone(),
            status: self.status(),
            started_at: self.started_at,
            metadata: self
                .metadata
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }
}
