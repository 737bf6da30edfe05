// Adapter registry
//
// Owned mapping from framework identifier to adapter constructor.
// Written once at startup, read afterwards; unknown frameworks fall back
// to the manual variant.

use std::collections::HashMap;

use crate::adapters::{Adapter, LangChainAdapter, LangGraphAdapter, ManualAdapter};
use crate::detect::FrameworkId;

type AdapterFactory = Box<dyn Fn() -> Box<dyn Adapter> + Send + Sync>;

pub struct AdapterRegistry {
    factories: HashMap<FrameworkId, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in adapters
    ///
    /// openai/anthropic use the manual variant: their SDKs expose no
    /// callback dispatch to wrap.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FrameworkId::LangChain, || Box::new(LangChainAdapter::new()));
        registry.register(FrameworkId::LangGraph, || Box::new(LangGraphAdapter::new()));
        registry.register(FrameworkId::OpenAi, || {
            Box::new(ManualAdapter::for_framework(FrameworkId::OpenAi))
        });
        registry.register(FrameworkId::Anthropic, || {
            Box::new(ManualAdapter::for_framework(FrameworkId::Anthropic))
        });
        registry.register(FrameworkId::Manual, || Box::new(ManualAdapter::new()));
        registry
    }

    pub fn register(
        &mut self,
        id: FrameworkId,
        factory: impl Fn() -> Box<dyn Adapter> + Send + Sync + 'static,
    ) {
        self.factories.insert(id, Box::new(factory));
    }

    /// Construct the adapter for a framework, falling back to manual
    pub fn create(&self, id: FrameworkId) -> Box<dyn Adapter> {
        match self.factories.get(&id) {
            Some(factory) => factory(),
            None => Box::new(ManualAdapter::new()),
        }
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_all_frameworks() {
        let registry = AdapterRegistry::with_defaults();
        for id in [
            FrameworkId::LangChain,
            FrameworkId::LangGraph,
            FrameworkId::OpenAi,
            FrameworkId::Anthropic,
            FrameworkId::Manual,
        ] {
            let adapter = registry.create(id);
            assert_eq!(adapter.framework(), id);
        }
    }

    #[test]
    fn test_unregistered_framework_falls_back_to_manual() {
        let registry = AdapterRegistry::new();
        let adapter = registry.create(FrameworkId::LangChain);
        assert_eq!(adapter.framework(), FrameworkId::Manual);
    }
}
