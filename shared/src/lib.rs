//! # Tether Shared
//! Common functionality shared between tether-server & tether-client crates:
//! sequence diffing, the value model, live instances with per-peer change
//! tracking, identity pools, the reference dedup ledger, the value codec and
//! the sync agents that turn instances into wire messages and back.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod diff;

mod agent;
mod apply_config;
mod codec;
mod descriptor;
mod error;
mod instance;
mod invocation;
mod key_generator;
mod ledger;
mod messages;
mod peer;
mod pool;
mod transport;
mod types;
mod value;

pub use agent::{
    agent_provider::{AgentProvider, BuiltinProvider, RecordAgentProvider},
    agent_registry::AgentRegistry,
    fields::FieldData,
    map_agent::MapAgent,
    object_agent::ObjectAgent,
    record_agent::RecordAgent,
    sequence_agent::SequenceAgent,
    set_agent::SetAgent,
    sync_agent::{with_dirty, SyncAgent},
};
pub use apply_config::{ApplyConfig, ApplyReport, DuplicateCreatePolicy};
pub use codec::{
    object_tracker::ObjectTracker, value_decoder::ValueDecoder, value_encoder::ValueEncoder,
};
pub use descriptor::{
    method_descriptor::{InvokeMode, MethodDescriptor, MethodFuture, MethodHandler},
    property_descriptor::{ChangeHook, PropertyDescriptor},
    type_descriptor::{TypeDescriptor, TypeDescriptorBuilder},
};
pub use diff::{SpliceError, SpliceInstruction};
pub use error::SyncError;
pub use instance::{
    dirty_set::{DirtyKey, DirtySet},
    instance::{Instance, WeakInstance},
    mut_channel::{MutChannel, MutReceiver, Mutation},
    state::{InstanceState, Shape},
};
pub use invocation::{invocations::Invocations, pending_result::PendingResult};
pub use key_generator::{CorrelationIdGenerator, ObjectIdGenerator};
pub use ledger::{
    reference_ledger::{PeerReferenceState, ReferenceLedger},
    reference_scope::{FieldKey, ReferenceScope},
};
pub use messages::{
    payload::{from_data, to_data, ElementOp, EntryOp, MapEntries},
    sync_message::{MethodResultMessage, SyncMessage},
};
pub use peer::{ClientToken, PeerDescriptor, PeerInfo, Visibility};
pub use pool::{
    object_lookup::ObjectLookup,
    object_pool::ObjectPool,
    weak_object_pool::{Finalized, WeakObjectPool},
};
pub use transport::{error::TransportError, Transport};
pub use types::{CorrelationId, ObjectId, TypeTag, MAP_TYPE, OBJECT_TYPE, SEQUENCE_TYPE, SET_TYPE};
pub use value::{
    key::Key,
    value::Value,
    wire_value::{WireReference, WireValue},
};
