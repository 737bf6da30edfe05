// Collector client
//
// Ships event batches and heartbeats to the remote collector over
// HTTP/JSON with bearer auth. Outcomes are classified rather than
// propagated as errors: the transport worker decides what each class
// means for the queue and the session.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use agentmon_contracts::{EventBatch, Heartbeat};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};

/// Classified result of one transmission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 2xx, everything accepted
    Accepted,
    /// Network error, 5xx, or 429; retry with backoff
    Transient {
        /// Server-provided delay from a 429 Retry-After header
        retry_after: Option<Duration>,
        reason: String,
    },
    /// 401/403; halt delivery for the session
    AuthRejected,
    /// Any other 4xx; the batch is poison, drop it and move on
    Rejected { status: u16 },
}

/// Transport boundary to the remote collector
#[async_trait]
pub trait Collector: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Ship one batch of events
    async fn post_events(&self, batch: &EventBatch) -> DeliveryOutcome;

    /// Ship one heartbeat
    async fn post_heartbeat(&self, heartbeat: &Heartbeat) -> DeliveryOutcome;
}

/// HTTP/JSON collector client
pub struct HttpCollector {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpCollector {
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MonitorError::config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.collector_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> DeliveryOutcome {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "posting to collector");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await;

        match response {
            Ok(response) => classify(response),
            Err(e) => DeliveryOutcome::Transient {
                retry_after: None,
                reason: e.to_string(),
            },
        }
    }
}

fn classify(response: Response) -> DeliveryOutcome {
    let status = response.status();

    if status.is_success() {
        return DeliveryOutcome::Accepted;
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DeliveryOutcome::AuthRejected,
        StatusCode::TOO_MANY_REQUESTS => DeliveryOutcome::Transient {
            retry_after: retry_after(&response),
            reason: "rate limited".to_string(),
        },
        s if s.is_client_error() => DeliveryOutcome::Rejected {
            status: s.as_u16(),
        },
        s => DeliveryOutcome::Transient {
            retry_after: None,
            reason: format!("HTTP {s}"),
        },
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl Collector for HttpCollector {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn post_events(&self, batch: &EventBatch) -> DeliveryOutcome {
        self.post("/events", batch).await
    }

    async fn post_heartbeat(&self, heartbeat: &Heartbeat) -> DeliveryOutcome {
        self.post("/heartbeat", heartbeat).await
    }
}
