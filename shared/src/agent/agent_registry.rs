use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use crate::{Instance, SyncError, TypeDescriptor, TypeTag};

use super::{
    agent_provider::{AgentProvider, BuiltinProvider, RecordAgentProvider},
    sync_agent::SyncAgent,
};

/// Maps type tags to agent providers. Starts out with the built-in types;
/// user types are added with [`AgentRegistry::register_type`].
#[derive(Clone)]
pub struct AgentRegistry {
    providers: IndexMap<TypeTag, Arc<dyn AgentProvider>>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for provider in BuiltinProvider::all() {
            registry.register(Arc::new(provider));
        }
        registry
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry without the built-in types
    pub fn empty() -> Self {
        Self {
            providers: IndexMap::new(),
        }
    }

    /// Adds a provider, replacing any earlier one for the same tag
    pub fn register(&mut self, provider: Arc<dyn AgentProvider>) -> &mut Self {
        debug!("Registering agent provider for type '{}'", provider.type_tag());
        self.providers.insert(provider.type_tag().clone(), provider);
        self
    }

    pub fn register_type(&mut self, descriptor: Arc<TypeDescriptor>) -> &mut Self {
        self.register(Arc::new(RecordAgentProvider::new(descriptor)))
    }

    pub fn provider(&self, type_tag: &TypeTag) -> Result<&Arc<dyn AgentProvider>, SyncError> {
        self.providers
            .get(type_tag)
            .ok_or_else(|| SyncError::UnregisteredType {
                type_tag: type_tag.clone(),
            })
    }

    pub fn contains(&self, type_tag: &TypeTag) -> bool {
        self.providers.contains_key(type_tag)
    }

    pub fn instantiate(&self, type_tag: &TypeTag) -> Result<Instance, SyncError> {
        Ok(self.provider(type_tag)?.instantiate())
    }

    pub fn create_agent(&self, type_tag: &TypeTag) -> Result<Box<dyn SyncAgent>, SyncError> {
        Ok(self.provider(type_tag)?.create_agent())
    }

    pub fn type_tags(&self) -> impl Iterator<Item = &TypeTag> {
        self.providers.keys()
    }
}
