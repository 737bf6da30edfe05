// Integration adapters
//
// One variant per supported framework plus the manual fallback. Adapters
// install hooks via the dispatch slot and translate framework-native
// callback kinds into the canonical raw shape on the host thread.
// setup is idempotent; teardown is safe to call any number of times.

mod langchain;
mod langgraph;
mod manual;

pub use langchain::LangChainAdapter;
pub use langgraph::LangGraphAdapter;
pub use manual::ManualAdapter;

use std::sync::Arc;

use crate::detect::{FrameworkId, HostRegistry};
use crate::error::Result;
use crate::pipeline::EventSink;

/// Framework-specific hook installer/remover
pub trait Adapter: Send + Sync {
    /// The framework this adapter instruments
    fn framework(&self) -> FrameworkId;

    /// Install interception points into the host dispatch path
    ///
    /// Idempotent: a second call for the same session is a no-op.
    fn setup(&mut self, host: &HostRegistry, sink: Arc<EventSink>) -> Result<()>;

    /// Reverse every installed interception
    ///
    /// Safe to call zero, one, or many times, including after the host
    /// has partially shut down.
    fn teardown(&mut self);
}
