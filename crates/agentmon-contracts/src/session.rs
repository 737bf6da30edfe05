// Session domain types
//
// A session is one monitored agent run. It is owned exclusively by the
// pipeline: created when the adapter is set up, transitioned by hook
// events and transport outcomes, and dropped on stop.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Starting,
    Running,
    Idle,
    Errored,
    Stopped,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Starting => write!(f, "starting"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Errored => write!(f, "errored"),
            SessionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

impl From<&str> for SessionStatus {
    fn from(s: &str) -> Self {
        match s {
            "running" => SessionStatus::Running,
            "idle" => SessionStatus::Idle,
            "errored" => SessionStatus::Errored,
            "stopped" => SessionStatus::Stopped,
            _ => SessionStatus::Starting,
        }
    }
}

/// Session - one monitored agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque unique identifier assigned at start
    pub session_id: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    /// Free-form scalar metadata (framework, host, pid, ...)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            status: SessionStatus::Starting,
            started_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_via_str() {
        for status in [
            SessionStatus::Starting,
            SessionStatus::Running,
            SessionStatus::Idle,
            SessionStatus::Errored,
            SessionStatus::Stopped,
        ] {
            assert_eq!(SessionStatus::from(status.to_string().as_str()), status);
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Errored).unwrap();
        assert_eq!(json, "\"errored\"");
    }

    #[test]
    fn test_new_session_is_starting() {
        let session = Session::new("s-1").with_metadata("pid", serde_json::json!(42));
        assert_eq!(session.status, SessionStatus::Starting);
        assert_eq!(session.metadata["pid"], serde_json::json!(42));
    }
}
