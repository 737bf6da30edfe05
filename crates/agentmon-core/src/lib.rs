// Agent monitoring pipeline
//
// This crate instruments a running AI-agent process and streams normalized
// telemetry to a remote collector without blocking the host.
//
// Key design decisions:
// - Hooks translate and enqueue on the host thread; all network I/O lives
//   in one transport worker per session
// - Hook interception is an explicit wrap/restore pair on a dispatch slot,
//   never an irreversible patch
// - Delivery is bounded and observable: drop-oldest queue, counted
//   evictions, bounded backoff, degraded events for every loss path

pub mod adapters;
pub mod collector;
pub mod config;
pub mod detect;
pub mod error;
pub mod heartbeat;
pub mod hooks;
pub mod monitor;
pub mod normalize;
pub mod pipeline;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use adapters::{Adapter, LangChainAdapter, LangGraphAdapter, ManualAdapter};
pub use collector::{Collector, DeliveryOutcome, HttpCollector};
pub use config::MonitorConfig;
pub use detect::{detect, FrameworkDescriptor, FrameworkId, HostRegistry};
pub use error::{MonitorError, Result};
pub use hooks::{DispatchSlot, HostCallback, RestoreHandle};
pub use monitor::{AgentMonitor, MonitorHandle};
pub use registry::AdapterRegistry;
pub use retry::RetryPolicy;

// Re-export the shared contracts
pub use agentmon_contracts::{
    Event, EventBatch, EventType, Heartbeat, RawCallback, Session, SessionStatus,
};
