// Raw callback shape
//
// Every adapter translates its framework's native callbacks into this
// canonical shape on the host thread; the normalizer consumes nothing
// else. Unknown kinds degrade during normalization instead of being
// dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical callback kind strings
pub mod kind {
    pub const STEP_START: &str = "step_start";
    pub const STEP_END: &str = "step_end";
    pub const TOOL_CALL: &str = "tool_call";
    pub const ERROR: &str = "error";
}

/// Framework-agnostic callback record produced by adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCallback {
    /// One of the canonical kind strings; anything else is malformed
    pub kind: String,
    /// Name of the step/tool/chain the callback refers to, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Framework-provided fields, already keyed by canonical names
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl RawCallback {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            fields: serde_json::Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn step_start(name: impl Into<String>) -> Self {
        Self::new(kind::STEP_START).with_name(name)
    }

    pub fn step_end(name: impl Into<String>) -> Self {
        Self::new(kind::STEP_END).with_name(name)
    }

    pub fn tool_call(name: impl Into<String>) -> Self {
        Self::new(kind::TOOL_CALL).with_name(name)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(kind::ERROR).with_field("message", serde_json::Value::String(message.into()))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_canonical_kinds() {
        assert_eq!(RawCallback::step_start("plan").kind, kind::STEP_START);
        assert_eq!(RawCallback::step_end("plan").kind, kind::STEP_END);
        assert_eq!(RawCallback::tool_call("search").kind, kind::TOOL_CALL);
        assert_eq!(RawCallback::error("boom").kind, kind::ERROR);
    }

    #[test]
    fn test_error_carries_message_field() {
        let raw = RawCallback::error("connection reset");
        assert_eq!(
            raw.fields["message"],
            serde_json::Value::String("connection reset".to_string())
        );
    }
}
