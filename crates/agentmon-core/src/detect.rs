// Framework detection
//
// Host glue announces the frameworks present in the process into an owned
// HostRegistry, together with the dispatch slot each one exposes. The
// detector ranks announced frameworks by specificity and never fails: an
// empty registry simply means the manual adapter.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::hooks::DispatchSlot;

/// Supported agent framework identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameworkId {
    /// LangGraph extends LangChain and ranks above it
    LangGraph,
    LangChain,
    OpenAi,
    Anthropic,
    /// Caller-driven events, no hook installation
    Manual,
}

impl FrameworkId {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameworkId::LangGraph => "langgraph",
            FrameworkId::LangChain => "langchain",
            FrameworkId::OpenAi => "openai",
            FrameworkId::Anthropic => "anthropic",
            FrameworkId::Manual => "manual",
        }
    }

    /// The more generic framework this one builds on, if any
    pub fn extends(&self) -> Option<FrameworkId> {
        match self {
            FrameworkId::LangGraph => Some(FrameworkId::LangChain),
            _ => None,
        }
    }
}

impl std::fmt::Display for FrameworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a host announces about one framework
#[derive(Debug, Clone)]
pub struct FrameworkDescriptor {
    pub id: FrameworkId,
    pub version: Option<String>,
    /// Framework modules visible in the process, used as a ranking tiebreak
    pub modules: Vec<String>,
}

impl FrameworkDescriptor {
    pub fn new(id: FrameworkId) -> Self {
        Self {
            id,
            version: None,
            modules: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }
}

/// Owned registry of frameworks visible in the host process
///
/// Written during host startup, read-mostly afterwards. Announcing a
/// framework creates the dispatch slot adapters later wrap.
pub struct HostRegistry {
    frameworks: RwLock<Vec<FrameworkDescriptor>>,
    slots: RwLock<HashMap<FrameworkId, DispatchSlot>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self {
            frameworks: RwLock::new(Vec::new()),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Announce a framework and get the dispatch slot the host must route
    /// its callbacks through
    ///
    /// Announcing the same framework again returns the existing slot.
    pub fn announce(&self, descriptor: FrameworkDescriptor) -> DispatchSlot {
        let id = descriptor.id;
        {
            let mut frameworks = self.frameworks.write().unwrap_or_else(|e| e.into_inner());
            if !frameworks.iter().any(|d| d.id == id) {
                frameworks.push(descriptor);
            }
        }

        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.entry(id).or_insert_with(DispatchSlot::noop).clone()
    }

    pub fn descriptors(&self) -> Vec<FrameworkDescriptor> {
        self.frameworks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn descriptor(&self, id: FrameworkId) -> Option<FrameworkDescriptor> {
        self.descriptors().into_iter().find(|d| d.id == id)
    }

    pub fn slot(&self, id: FrameworkId) -> Option<DispatchSlot> {
        self.slots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Rank announced frameworks, most specific first
///
/// Ordering: frameworks whose base is also present rank above the base
/// (specificity), then more announced modules, then stable id order.
/// Never fails; an empty registry yields an empty list and the pipeline
/// falls back to the manual adapter.
pub fn detect(host: &HostRegistry) -> Vec<FrameworkId> {
    let descriptors = host.descriptors();
    let present: Vec<FrameworkId> = descriptors.iter().map(|d| d.id).collect();

    let specificity = |id: FrameworkId| -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(base) = current.extends() {
            if !present.contains(&base) {
                break;
            }
            depth += 1;
            current = base;
        }
        depth
    };

    let mut ranked = descriptors;
    ranked.sort_by(|a, b| {
        specificity(b.id)
            .cmp(&specificity(a.id))
            .then(b.modules.len().cmp(&a.modules.len()))
            .then(a.id.cmp(&b.id))
    });

    let candidates: Vec<FrameworkId> = ranked.iter().map(|d| d.id).collect();
    debug!(?candidates, "framework detection ranked candidates");
    candidates
}
