// LangGraph adapter
//
// LangGraph builds on LangChain but reports node and graph transitions
// rather than chain callbacks, so it gets its own kind table.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use agentmon_contracts::{callback::kind, RawCallback};

use crate::detect::{FrameworkId, HostRegistry};
use crate::error::{MonitorError, Result};
use crate::hooks::{HostCallback, RestoreHandle};
use crate::pipeline::EventSink;

use super::Adapter;

pub struct LangGraphAdapter {
    restore: Option<RestoreHandle>,
}

impl LangGraphAdapter {
    pub fn new() -> Self {
        Self { restore: None }
    }

    fn translate(callback: &HostCallback) -> RawCallback {
        let canonical = match callback.kind.as_str() {
            "graph_start" | "node_enter" => kind::STEP_START,
            "graph_end" | "node_exit" => kind::STEP_END,
            "tool_invoke" => kind::TOOL_CALL,
            "graph_error" | "node_error" => kind::ERROR,
            other => other,
        };

        let mut raw = RawCallback {
            kind: canonical.to_string(),
            name: callback.name.clone(),
            fields: callback.fields.clone(),
            timestamp: Utc::now(),
        };
        raw.fields.insert(
            "framework".to_string(),
            serde_json::Value::String(FrameworkId::LangGraph.as_str().to_string()),
        );
        raw
    }
}

impl Default for LangGraphAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for LangGraphAdapter {
    fn framework(&self) -> FrameworkId {
        FrameworkId::LangGraph
    }

    fn setup(&mut self, host: &HostRegistry, sink: Arc<EventSink>) -> Result<()> {
        if self.restore.is_some() {
            return Ok(());
        }

        let slot = host.slot(FrameworkId::LangGraph).ok_or_else(|| {
            MonitorError::hook("langgraph announced no dispatch slot in this process")
        })?;

        self.restore = Some(slot.wrap(move |callback| {
            sink.ingest(Self::translate(callback));
        }));
        debug!("langgraph hooks installed");
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore.restore();
            debug!("langgraph hooks removed");
        }
    }
}
