// Error types for the monitoring pipeline

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors surfaced at the SDK boundary
///
/// Nothing in the hook or transport path returns these into host code;
/// they only appear from `AgentMonitor::start` and configuration APIs.
/// In-pipeline failures are converted to `degraded` events instead.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failed to reach the collector
    #[error("Connection error: {0}")]
    Connection(String),

    /// Collector rejected the credentials
    #[error("Authentication rejected: {0}")]
    Auth(String),

    /// Hook installation error
    #[error("Hook error: {0}")]
    Hook(String),

    /// Invalid redaction rule
    #[error("Invalid redaction rule: {0}")]
    Redaction(#[from] regex::Error),
}

impl MonitorError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        MonitorError::Configuration(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        MonitorError::Connection(msg.into())
    }

    /// Create a hook installation error
    pub fn hook(msg: impl Into<String>) -> Self {
        MonitorError::Hook(msg.into())
    }
}
