// Monitor configuration
//
// Built programmatically or from AGENT_MONITOR_* environment variables.
// Validation happens once at start; workers treat the config as immutable.

use std::env;
use std::time::Duration;

use crate::error::{MonitorError, Result};
use crate::retry::RetryPolicy;

/// Configuration for one monitored session
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Bearer token for the collector API
    pub api_key: String,

    /// Base URL of the collector (e.g. https://collector.example.com)
    pub collector_url: String,

    /// Human-readable agent name recorded in session metadata
    pub agent_name: Option<String>,

    /// Maximum events per batch
    pub batch_size: usize,

    /// Maximum serialized bytes per batch
    pub max_batch_bytes: usize,

    /// How often the transport worker flushes a partial batch
    pub flush_interval: Duration,

    /// Per-session queue capacity; overflow drops the oldest event
    pub queue_cap: usize,

    /// Interval between heartbeats; zero disables the ticker
    pub heartbeat_interval: Duration,

    /// HTTP request timeout
    pub request_timeout: Duration,

    /// Backoff policy for transient delivery failures
    pub retry: RetryPolicy,

    /// Case-insensitive regex fragments matched against payload keys;
    /// matching values are replaced with the redaction marker
    pub redaction_rules: Vec<String>,

    /// Maximum serialized payload size per event
    pub payload_cap_bytes: usize,

    /// Maximum length for a single string value in a payload
    pub value_cap_bytes: usize,

    /// Consecutive transient failure beyond this window marks the session errored
    pub failure_window: Duration,
}

impl MonitorConfig {
    /// Create a configuration with defaults for everything but the endpoint
    pub fn new(collector_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            collector_url: collector_url.into(),
            agent_name: None,
            batch_size: 64,
            max_batch_bytes: 256 * 1024,
            flush_interval: Duration::from_secs(2),
            queue_cap: 1024,
            heartbeat_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::exponential(),
            redaction_rules: Self::default_redaction_rules(),
            payload_cap_bytes: 8 * 1024,
            value_cap_bytes: 2 * 1024,
            failure_window: Duration::from_secs(60),
        }
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `AGENT_MONITOR_URL`: collector base URL (required)
    /// - `AGENT_MONITOR_API_KEY`: bearer token (required)
    /// - `AGENT_MONITOR_AGENT_NAME`: agent name for session metadata
    /// - `AGENT_MONITOR_BATCH_SIZE`: events per batch
    /// - `AGENT_MONITOR_FLUSH_INTERVAL_MS`: flush timer in milliseconds
    /// - `AGENT_MONITOR_QUEUE_CAP`: queue capacity
    /// - `AGENT_MONITOR_HEARTBEAT_INTERVAL_MS`: heartbeat interval in milliseconds
    ///
    /// Returns None if the required variables are not set.
    pub fn from_env() -> Option<Self> {
        let collector_url = env::var("AGENT_MONITOR_URL").ok()?;
        let api_key = env::var("AGENT_MONITOR_API_KEY").ok()?;

        if collector_url.is_empty() || api_key.is_empty() {
            return None;
        }

        let mut config = Self::new(collector_url, api_key);

        config.agent_name = env::var("AGENT_MONITOR_AGENT_NAME").ok();

        if let Some(batch_size) = env::var("AGENT_MONITOR_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.batch_size = batch_size;
        }

        if let Some(millis) = env::var("AGENT_MONITOR_FLUSH_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.flush_interval = Duration::from_millis(millis);
        }

        if let Some(queue_cap) = env::var("AGENT_MONITOR_QUEUE_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.queue_cap = queue_cap;
        }

        if let Some(millis) = env::var("AGENT_MONITOR_HEARTBEAT_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.heartbeat_interval = Duration::from_millis(millis);
        }

        Some(config)
    }

    /// Key patterns redacted by default
    pub fn default_redaction_rules() -> Vec<String> {
        [
            "api[_-]?key",
            "secret",
            "token",
            "password",
            "authorization",
            "credential",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Set the agent name
    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = Some(name.into());
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the flush interval
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the queue capacity
    pub fn with_queue_cap(mut self, queue_cap: usize) -> Self {
        self.queue_cap = queue_cap;
        self
    }

    /// Set the heartbeat interval (zero disables heartbeats)
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Append a redaction rule to the deny-list
    pub fn with_redaction_rule(mut self, rule: impl Into<String>) -> Self {
        self.redaction_rules.push(rule.into());
        self
    }

    /// Set the failure window
    pub fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.collector_url.is_empty() {
            return Err(MonitorError::config(
                "Collector URL is required. Set via MonitorConfig or AGENT_MONITOR_URL.",
            ));
        }
        if self.api_key.is_empty() {
            return Err(MonitorError::config(
                "API key is required. Set via MonitorConfig or AGENT_MONITOR_API_KEY.",
            ));
        }
        if self.batch_size == 0 {
            return Err(MonitorError::config("batch_size must be at least 1"));
        }
        if self.queue_cap < self.batch_size {
            return Err(MonitorError::config(
                "queue_cap must be at least batch_size",
            ));
        }
        if self.payload_cap_bytes == 0 || self.value_cap_bytes == 0 {
            return Err(MonitorError::config("payload caps must be non-zero"));
        }
        if self.flush_interval.is_zero() {
            return Err(MonitorError::config("flush_interval must be non-zero"));
        }
        Ok(())
    }
}
