//! Static lookup table from capability to strategy factory.

use std::collections::HashMap;
use std::sync::Arc;

use super::{BasicHttpFactory, Capability, FulfillmentStrategyFactory};

/// Registry of fulfillment strategy factories, keyed by capability
///
/// Built once, explicitly, by whoever wires the application together.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: HashMap<Capability, Arc<dyn FulfillmentStrategyFactory>>,
}

impl StrategyRegistry {
    /// An empty registry; every lookup misses
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the strategies shipped with this crate
    pub fn with_defaults() -> Self {
        Self::new().register(BasicHttpFactory::default())
    }

    /// Add a factory, replacing any earlier one with the same capability
    pub fn register<F>(mut self, factory: F) -> Self
    where
        F: FulfillmentStrategyFactory + 'static,
    {
        self.factories.insert(factory.capability(), Arc::new(factory));
        self
    }

    pub fn find_strategy(
        &self,
        capability: &Capability,
    ) -> Option<Arc<dyn FulfillmentStrategyFactory>> {
        self.factories.get(capability).cloned()
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        let mut capabilities: Vec<Capability> = self.factories.keys().cloned().collect();
        capabilities.sort_by_key(|c| c.to_string());
        capabilities
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry_finds_nothing() {
        let registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.find_strategy(&Capability::Basic).is_none());
    }

    #[test]
    fn test_defaults_register_basic_http() {
        let registry = StrategyRegistry::with_defaults();

        let factory = registry.find_strategy(&Capability::Basic).unwrap();
        assert_eq!(factory.capability(), Capability::Basic);
        assert!(registry
            .find_strategy(&Capability::Custom("overdrive".to_string()))
            .is_none());
        assert_eq!(registry.capabilities(), vec![Capability::Basic]);
    }
}
