// Monitor lifecycle
//
// AgentMonitor::start wires the whole pipeline for one session: detect
// the framework, set up the adapter, spawn the transport worker and
// heartbeat ticker. The returned handle is the SDK boundary: manual
// events, status updates, counters, and stop.

use std::sync::{Arc, Mutex};

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use agentmon_contracts::{Heartbeat, RawCallback, Session, SessionStatus};

use crate::adapters::Adapter;
use crate::collector::{Collector, DeliveryOutcome, HttpCollector};
use crate::config::MonitorConfig;
use crate::detect::{detect, FrameworkId, HostRegistry};
use crate::error::Result;
use crate::heartbeat::HeartbeatTicker;
use crate::normalize::Normalizer;
use crate::pipeline::EventSink;
use crate::queue::DeliveryQueue;
use crate::registry::AdapterRegistry;
use crate::session::SessionState;
use crate::transport::TransportWorker;

/// Entry point for starting a monitored session
pub struct AgentMonitor;

impl AgentMonitor {
    /// Start monitoring with the built-in adapter registry
    ///
    /// Must be called within a tokio runtime; the transport worker and
    /// heartbeat ticker are spawned onto it.
    pub fn start(config: MonitorConfig, host: &HostRegistry) -> Result<MonitorHandle> {
        Self::start_with_registry(config, host, &AdapterRegistry::with_defaults())
    }

    /// Start monitoring with a custom adapter registry
    pub fn start_with_registry(
        config: MonitorConfig,
        host: &HostRegistry,
        registry: &AdapterRegistry,
    ) -> Result<MonitorHandle> {
        config.validate()?;

        let candidates = detect(host);
        let selected = candidates.first().copied().unwrap_or(FrameworkId::Manual);

        let session_id = format!("agent-{}-{}", std::process::id(), Uuid::now_v7());
        let session = Arc::new(SessionState::new(session_id));
        session.insert_metadata("framework", serde_json::json!(selected.as_str()));
        session.insert_metadata("pid", serde_json::json!(std::process::id()));
        if let Some(name) = &config.agent_name {
            session.insert_metadata("agent_name", serde_json::json!(name));
        }
        if let Some(version) = host.descriptor(selected).and_then(|d| d.version) {
            session.insert_metadata("framework_version", serde_json::json!(version));
        }

        let queue = Arc::new(DeliveryQueue::new(config.queue_cap));
        let nudge = Arc::new(Notify::new());
        let normalizer = Normalizer::new(
            &config.redaction_rules,
            config.payload_cap_bytes,
            config.value_cap_bytes,
        )?;
        let sink = Arc::new(EventSink::new(
            session.clone(),
            queue.clone(),
            normalizer,
            nudge.clone(),
            config.batch_size,
        ));
        let collector: Arc<dyn Collector> = Arc::new(HttpCollector::new(&config)?);

        let mut adapter = registry.create(selected);
        adapter.setup(host, sink.clone())?;

        if candidates.len() > 1 {
            warn!(
                selected = %selected,
                candidates = ?candidates.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
                "multiple frameworks detected, using ranked first"
            );
            let mut fields = serde_json::Map::new();
            fields.insert("selected".to_string(), serde_json::json!(selected.as_str()));
            fields.insert(
                "candidates".to_string(),
                serde_json::json!(candidates.iter().map(|c| c.as_str()).collect::<Vec<_>>()),
            );
            sink.diagnostic("ambiguous_framework_detection", fields);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = Arc::new(config);
        session.set_status(SessionStatus::Running);

        let mut workers = Vec::new();
        workers.push(
            TransportWorker::new(
                session.clone(),
                queue.clone(),
                sink.clone(),
                collector.clone(),
                config.clone(),
                shutdown_rx.clone(),
                nudge.clone(),
            )
            .spawn(),
        );
        if !config.heartbeat_interval.is_zero() {
            workers.push(
                HeartbeatTicker::new(
                    session.clone(),
                    collector.clone(),
                    config.heartbeat_interval,
                    shutdown_rx,
                )
                .spawn(),
            );
        }

        info!(
            session_id = %session.session_id(),
            framework = %selected,
            "agent monitoring started"
        );

        Ok(MonitorHandle {
            session,
            queue,
            sink,
            collector,
            adapter: Mutex::new(adapter),
            shutdown: shutdown_tx,
            workers,
            stopped: false,
        })
    }
}

/// Handle to a running monitored session
///
/// Owning the handle keeps the pipeline alive. Dropping it without
/// calling `stop` still signals the workers and removes the hooks, but
/// skips the final flush.
pub struct MonitorHandle {
    session: Arc<SessionState>,
    queue: Arc<DeliveryQueue>,
    sink: Arc<EventSink>,
    collector: Arc<dyn Collector>,
    adapter: Mutex<Box<dyn Adapter>>,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl MonitorHandle {
    pub fn session_id(&self) -> &str {
        self.session.session_id()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Update the session status (e.g. mark the agent idle)
    pub fn set_status(&self, status: SessionStatus) {
        self.session.set_status(status);
    }

    /// Emit a caller-driven event through the normal ingest path
    ///
    /// This is how the manual adapter (and the openai/anthropic variants)
    /// report activity.
    pub fn emit(&self, raw: RawCallback) {
        self.sink.ingest(raw);
    }

    /// Snapshot of the session entity
    pub fn session(&self) -> Session {
        self.session.snapshot()
    }

    /// Events evicted from the queue since start
    pub fn eviction_count(&self) -> u64 {
        self.queue.evictions()
    }

    /// Events lost to rejected batches since start
    pub fn dropped_count(&self) -> u64 {
        self.session.dropped_events()
    }

    /// Stop monitoring: signal the workers, wait for the final flush,
    /// tear down the hooks, and report the stopped status
    pub async fn stop(mut self) {
        self.stopped = true;
        info!(session_id = %self.session.session_id(), "stopping agent monitoring");

        let _ = self.shutdown.send(true);
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }

        self.adapter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .teardown();
        self.session.set_status(SessionStatus::Stopped);

        if !self.session.is_delivery_halted() {
            let heartbeat = Heartbeat::new(self.session.session_id(), SessionStatus::Stopped);
            if self.collector.post_heartbeat(&heartbeat).await != DeliveryOutcome::Accepted {
                debug!(
                    session_id = %self.session.session_id(),
                    "final heartbeat not accepted"
                );
            }
        }

        info!(session_id = %self.session.session_id(), "agent monitoring stopped");
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        let _ = self.shutdown.send(true);
        self.adapter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .teardown();
    }
}
