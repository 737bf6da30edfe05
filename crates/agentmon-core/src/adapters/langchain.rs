// LangChain adapter
//
// Taps the chain/LLM/tool callback dispatch and translates the callback
// handler names into canonical raw callbacks. The tap runs on the host
// thread: translate and enqueue only.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use agentmon_contracts::{callback::kind, RawCallback};

use crate::detect::{FrameworkId, HostRegistry};
use crate::error::{MonitorError, Result};
use crate::hooks::{HostCallback, RestoreHandle};
use crate::pipeline::EventSink;

use super::Adapter;

pub struct LangChainAdapter {
    restore: Option<RestoreHandle>,
}

impl LangChainAdapter {
    pub fn new() -> Self {
        Self { restore: None }
    }

    fn translate(callback: &HostCallback) -> RawCallback {
        let canonical = match callback.kind.as_str() {
            "on_chain_start" | "on_llm_start" | "on_agent_start" => kind::STEP_START,
            "on_chain_end" | "on_llm_end" | "on_tool_end" | "on_agent_finish" => kind::STEP_END,
            "on_tool_start" | "on_agent_action" => kind::TOOL_CALL,
            "on_chain_error" | "on_llm_error" | "on_tool_error" => kind::ERROR,
            // Unrecognized handler names degrade during normalization
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
            serde_json::Value::String(FrameworkId::LangChain.as_str().to_string()),
        );
        raw
    }
}

impl Default for LangChainAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for LangChainAdapter {
    fn framework(&self) -> FrameworkId {
        FrameworkId::LangChain
    }

    fn setup(&mut self, host: &HostRegistry, sink: Arc<EventSink>) -> Result<()> {
        if self.restore.is_some() {
            return Ok(());
        }

        let slot = host.slot(FrameworkId::LangChain).ok_or_else(|| {
            MonitorError::hook("langchain announced no dispatch slot in this process")
        })?;

        self.restore = Some(slot.wrap(move |callback| {
            sink.ingest(Self::translate(callback));
        }));
        debug!("langchain hooks installed");
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore.restore();
            debug!("langchain hooks removed");
        }
    }
}
