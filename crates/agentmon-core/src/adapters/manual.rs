// Manual adapter
//
// Fallback when no framework is detected, and the variant backing the
// openai/anthropic SDKs which expose no callback dispatch to wrap. All
// events arrive caller-driven through the monitor handle; setup and
// teardown install nothing.

use std::sync::Arc;

use tracing::debug;

use crate::detect::{FrameworkId, HostRegistry};
use crate::error::Result;
use crate::pipeline::EventSink;

use super::Adapter;

pub struct ManualAdapter {
    framework: FrameworkId,
}

impl ManualAdapter {
    pub fn new() -> Self {
        Self {
            framework: FrameworkId::Manual,
        }
    }

    /// Manual instrumentation labeled with a detected framework
    /// (openai/anthropic run through this variant)
    pub fn for_framework(framework: FrameworkId) -> Self {
        Self { framework }
    }
}

impl Default for ManualAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for ManualAdapter {
    fn framework(&self) -> FrameworkId {
        self.framework
    }

    fn setup(&mut self, _host: &HostRegistry, _sink: Arc<EventSink>) -> Result<()> {
        debug!(framework = %self.framework, "manual instrumentation active, no hooks installed");
        Ok(())
    }

    fn teardown(&mut self) {}
}
