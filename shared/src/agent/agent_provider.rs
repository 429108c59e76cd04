use std::sync::Arc;

use crate::{instance::state::Shape, Instance, TypeDescriptor, TypeTag};

use super::{
    map_agent::MapAgent, object_agent::ObjectAgent, record_agent::RecordAgent,
    sequence_agent::SequenceAgent, set_agent::SetAgent, sync_agent::SyncAgent,
};

/// Knows how to build blank instances and agents for one type tag
pub trait AgentProvider: Send + Sync {
    fn type_tag(&self) -> &TypeTag;

    /// Empty instance to be filled by an incoming `Create`
    fn instantiate(&self) -> Instance;

    fn create_agent(&self) -> Box<dyn SyncAgent>;
}

/// Provider for the built-in object, sequence, map and set types
pub struct BuiltinProvider {
    type_tag: TypeTag,
    shape: Shape,
}

impl BuiltinProvider {
    pub fn new(type_tag: TypeTag, shape: Shape) -> Self {
        Self { type_tag, shape }
    }

    pub fn all() -> Vec<BuiltinProvider> {
        vec![
            Self::new(TypeTag::object(), Shape::Fields),
            Self::new(TypeTag::sequence(), Shape::Sequence),
            Self::new(TypeTag::map(), Shape::Map),
            Self::new(TypeTag::set(), Shape::Set),
        ]
    }
}

impl AgentProvider for BuiltinProvider {
    fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    fn instantiate(&self) -> Instance {
        Instance::blank(self.type_tag.clone(), self.shape)
    }

    fn create_agent(&self) -> Box<dyn SyncAgent> {
        match self.shape {
            Shape::Fields => Box::new(ObjectAgent::new()),
            Shape::Sequence => Box::new(SequenceAgent::new()),
            Shape::Map => Box::new(MapAgent::new()),
            Shape::Set => Box::new(SetAgent::new()),
        }
    }
}

/// Provider for a user type declared with a [`TypeDescriptor`]
pub struct RecordAgentProvider {
    descriptor: Arc<TypeDescriptor>,
}

impl RecordAgentProvider {
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        Self { descriptor }
    }
}

impl AgentProvider for RecordAgentProvider {
    fn type_tag(&self) -> &TypeTag {
        self.descriptor.type_tag()
    }

    fn instantiate(&self) -> Instance {
        Instance::record(&self.descriptor)
    }

    fn create_agent(&self) -> Box<dyn SyncAgent> {
        Box::new(RecordAgent::new(self.descriptor.clone()))
    }
}
