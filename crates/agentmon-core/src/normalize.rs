// Event normalization
//
// Converts the canonical raw callback shape into Events: maps kinds onto
// event types, redacts deny-listed keys, enforces payload caps, and
// assigns sequence numbers. A malformed callback becomes a degraded event
// carrying whatever fields survived; nothing is dropped silently.

use regex::RegexSet;
use serde_json::{Map, Value};

use agentmon_contracts::{callback::kind, Event, EventType, RawCallback};

use crate::error::Result;
use crate::session::SessionState;

/// Replacement value for redacted fields
pub const REDACTED: &str = "[REDACTED]";

/// Key deny-list compiled from configurable regex fragments
pub struct Redactor {
    patterns: RegexSet,
}

impl Redactor {
    /// Compile the deny-list; patterns match case-insensitively anywhere
    /// in a payload key
    pub fn new(rules: &[String]) -> Result<Self> {
        let anchored: Vec<String> = rules.iter().map(|r| format!("(?i){r}")).collect();
        let patterns = RegexSet::new(&anchored)?;
        Ok(Self { patterns })
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        self.patterns.is_match(key)
    }
}

/// Pure converter from raw callbacks to canonical events
pub struct Normalizer {
    redactor: Redactor,
    payload_cap_bytes: usize,
    value_cap_bytes: usize,
}

impl Normalizer {
    pub fn new(
        redaction_rules: &[String],
        payload_cap_bytes: usize,
        value_cap_bytes: usize,
    ) -> Result<Self> {
        Ok(Self {
            redactor: Redactor::new(redaction_rules)?,
            payload_cap_bytes,
            value_cap_bytes,
        })
    }

    /// Convert one observed callback into an event
    ///
    /// The sequence number comes from the session's atomic counter; callers
    /// serialize normalize-and-enqueue so queue order matches sequence
    /// order.
    pub fn normalize(&self, raw: RawCallback, session: &SessionState) -> Event {
        let mut payload = Map::new();

        let event_type = match raw.kind.as_str() {
            kind::STEP_START => EventType::StepStart,
            kind::STEP_END => EventType::StepEnd,
            kind::TOOL_CALL => EventType::ToolCall,
            kind::ERROR => EventType::Error,
            other => {
                payload.insert(
                    "error".to_string(),
                    Value::String(format!("unrecognized callback kind: {other}")),
                );
                EventType::Degraded
            }
        };

        if let Some(name) = raw.name {
            payload.insert("name".to_string(), Value::String(name));
        }

        let mut used: usize = payload
            .iter()
            .map(|(k, v)| k.len() + value_size(v))
            .sum();
        let mut truncated = false;

        for (key, value) in raw.fields {
            if truncated {
                break;
            }
            let value = self.sanitize(&key, value);
            let size = key.len() + value_size(&value);
            if used + size > self.payload_cap_bytes {
                truncated = true;
                break;
            }
            used += size;
            payload.insert(key, value);
        }

        if truncated {
            payload.insert("truncated".to_string(), Value::Bool(true));
        }

        Event {
            session_id: session.session_id().to_string(),
            sequence_number: session.next_sequence(),
            event_type,
            timestamp: raw.timestamp,
            payload,
        }
    }

    /// Redact deny-listed keys and cap string values, recursing into
    /// nested objects
    fn sanitize(&self, key: &str, value: Value) -> Value {
        if self.redactor.is_sensitive(key) {
            return Value::String(REDACTED.to_string());
        }

        match value {
            Value::String(s) if s.len() > self.value_cap_bytes => {
                let mut end = self.value_cap_bytes;
                while !s.is_char_boundary(end) {
                    end -= 1;
                }
                Value::String(format!("{}…", &s[..end]))
            }
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| {
                        let v = self.sanitize(&k, v);
                        (k, v)
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

fn value_size(value: &Value) -> usize {
    serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0)
}
