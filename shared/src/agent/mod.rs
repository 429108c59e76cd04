pub mod agent_provider;
pub mod agent_registry;
pub mod fields;
pub mod map_agent;
pub mod object_agent;
pub mod record_agent;
pub mod sequence_agent;
pub mod set_agent;
pub mod sync_agent;
