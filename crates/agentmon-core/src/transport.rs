// Transport worker
//
// One worker per session drains the delivery queue into batches and ships
// them, retrying transient failures with bounded backoff. This is the only
// place events touch the network. The worker also surfaces queue evictions
// and dropped batches as degraded events so data loss stays observable.

use std::sync::Arc;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use agentmon_contracts::{Event, EventBatch, SessionStatus};

use crate::collector::{Collector, DeliveryOutcome};
use crate::config::MonitorConfig;
use crate::pipeline::EventSink;
use crate::queue::DeliveryQueue;
use crate::session::SessionState;

/// What happened to one batch after bounded retries
enum BatchResult {
    Delivered,
    /// Transient failures exhausted the retry budget; batch is back at
    /// the front of the queue
    Requeued,
    /// Credentials rejected; delivery is halted for the session
    Halted,
    /// Poison batch dropped so it cannot block the queue
    Dropped,
}

pub struct TransportWorker {
    session: Arc<SessionState>,
    queue: Arc<DeliveryQueue>,
    sink: Arc<EventSink>,
    collector: Arc<dyn Collector>,
    config: Arc<MonitorConfig>,
    shutdown: watch::Receiver<bool>,
    nudge: Arc<Notify>,
    reported_evictions: u64,
}

impl TransportWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<SessionState>,
        queue: Arc<DeliveryQueue>,
        sink: Arc<EventSink>,
        collector: Arc<dyn Collector>,
        config: Arc<MonitorConfig>,
        shutdown: watch::Receiver<bool>,
        nudge: Arc<Notify>,
    ) -> Self {
        Self {
            session,
            queue,
            sink,
            collector,
            config,
            shutdown,
            nudge,
            reported_evictions: 0,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drain the queue until shutdown, then make a final best-effort flush
    pub async fn run(mut self) {
        let mut flush = tokio::time::interval(self.config.flush_interval);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    info!(session_id = %self.session.session_id(), "transport worker shutting down");
                    break;
                }
                _ = flush.tick() => self.flush_pending().await,
                _ = self.nudge.notified() => self.flush_pending().await,
            }
        }

        self.flush_pending().await;
        debug!(
            session_id = %self.session.session_id(),
            remaining = self.queue.len(),
            "transport worker stopped"
        );
    }

    /// Send full batches until the queue is empty or a batch cannot proceed
    async fn flush_pending(&mut self) {
        if self.session.is_delivery_halted() {
            return;
        }

        self.surface_evictions();

        loop {
            let events = self
                .queue
                .next_batch(self.config.batch_size, self.config.max_batch_bytes);
            if events.is_empty() {
                return;
            }

            match self.send_with_retry(events).await {
                BatchResult::Delivered | BatchResult::Dropped => continue,
                BatchResult::Requeued | BatchResult::Halted => return,
            }
        }
    }

    /// Report queue overflow since the last flush as a degraded event
    fn surface_evictions(&mut self) {
        let total = self.queue.evictions();
        let delta = total - self.reported_evictions;
        if delta == 0 {
            return;
        }
        self.reported_evictions = total;

        warn!(
            session_id = %self.session.session_id(),
            evicted = delta,
            total,
            "queue overflowed, oldest events dropped"
        );
        let mut fields = serde_json::Map::new();
        fields.insert("evicted".to_string(), serde_json::json!(delta));
        fields.insert("evicted_total".to_string(), serde_json::json!(total));
        self.sink.diagnostic("queue_overflow", fields);
    }

    /// Transmit one batch with bounded backoff
    ///
    /// Retries keep the batch intact, so its internal event order is
    /// preserved; requeueing on exhaustion puts it back at the front so
    /// cross-batch order is preserved too.
    async fn send_with_retry(&self, events: Vec<Event>) -> BatchResult {
        let batch = EventBatch::new(self.session.session_id(), events);
        let policy = &self.config.retry;
        let mut attempt = 1u32;

        loop {
            match self.collector.post_events(&batch).await {
                DeliveryOutcome::Accepted => {
                    self.session.note_delivery_success();
                    if self.session.status() == SessionStatus::Errored {
                        self.session.set_status(SessionStatus::Running);
                    }
                    debug!(
                        session_id = %self.session.session_id(),
                        events = batch.len(),
                        attempt,
                        "batch delivered"
                    );
                    return BatchResult::Delivered;
                }

                DeliveryOutcome::AuthRejected => {
                    if self.session.halt_delivery() {
                        error!(
                            session_id = %self.session.session_id(),
                            "collector rejected credentials; delivery halted, buffering continues"
                        );
                        self.sink
                            .diagnostic("auth_rejected", serde_json::Map::new());
                    }
                    self.session.set_status(SessionStatus::Errored);
                    self.queue.requeue_front(batch.events);
                    return BatchResult::Halted;
                }

                DeliveryOutcome::Rejected { status } => {
                    let dropped = batch.len() as u64;
                    self.session.record_dropped(dropped);
                    warn!(
                        session_id = %self.session.session_id(),
                        status,
                        dropped,
                        "collector rejected batch, dropping it"
                    );
                    let mut fields = serde_json::Map::new();
                    fields.insert("status".to_string(), serde_json::json!(status));
                    fields.insert("dropped".to_string(), serde_json::json!(dropped));
                    self.sink.diagnostic("batch_rejected", fields);
                    return BatchResult::Dropped;
                }

                DeliveryOutcome::Transient {
                    retry_after,
                    reason,
                } => {
                    if self.session.note_transient_failure(self.config.failure_window) {
                        self.session.set_status(SessionStatus::Errored);
                    }

                    if !policy.has_attempts_remaining(attempt) {
                        warn!(
                            session_id = %self.session.session_id(),
                            attempts = attempt,
                            reason = %reason,
                            "delivery attempts exhausted, requeueing batch"
                        );
                        self.queue.requeue_front(batch.events);
                        return BatchResult::Requeued;
                    }

                    let delay = retry_after.unwrap_or_else(|| policy.delay_for_attempt(attempt + 1));
                    debug!(
                        session_id = %self.session.session_id(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "transient delivery failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
