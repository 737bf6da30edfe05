// Heartbeat scheduler
//
// Fixed-interval liveness signal per session, independent of event
// traffic. A missed heartbeat is logged and superseded by the next tick;
// nothing is queued or retried out-of-band. The ticker observes the same
// shutdown signal as the transport worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use agentmon_contracts::{Heartbeat, SessionStatus};

use crate::collector::{Collector, DeliveryOutcome};
use crate::session::SessionState;

pub struct HeartbeatTicker {
    session: Arc<SessionState>,
    collector: Arc<dyn Collector>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl HeartbeatTicker {
    pub fn new(
        session: Arc<SessionState>,
        collector: Arc<dyn Collector>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session,
            collector,
            interval,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        let mut ticks = tokio::time::interval(self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    debug!(session_id = %self.session.session_id(), "heartbeat ticker cancelled");
                    break;
                }
                _ = ticks.tick() => self.beat().await,
            }
        }
    }

    /// Send one heartbeat; failures are superseded by the next tick
    async fn beat(&self) {
        if self.session.is_delivery_halted() {
            debug!(
                session_id = %self.session.session_id(),
                "delivery halted, skipping heartbeat"
            );
            return;
        }

        let heartbeat = Heartbeat::new(self.session.session_id(), self.session.status());
        match self.collector.post_heartbeat(&heartbeat).await {
            DeliveryOutcome::Accepted => {
                debug!(
                    session_id = %self.session.session_id(),
                    status = %heartbeat.status,
                    "heartbeat delivered"
                );
            }
            DeliveryOutcome::AuthRejected => {
                if self.session.halt_delivery() {
                    error!(
                        session_id = %self.session.session_id(),
                        "collector rejected credentials on heartbeat; delivery halted"
                    );
                }
                self.session.set_status(SessionStatus::Errored);
            }
            DeliveryOutcome::Transient { reason, .. } => {
                warn!(
                    session_id = %self.session.session_id(),
                    reason = %reason,
                    "missed heartbeat, superseded by next tick"
                );
            }
            DeliveryOutcome::Rejected { status } => {
                warn!(
                    session_id = %self.session.session_id(),
                    status,
                    "collector rejected heartbeat"
                );
            }
        }
    }
}
