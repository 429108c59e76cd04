use thiserror::Error;

use crate::{
    diff::error::SpliceError, instance::state::Shape, transport::error::TransportError,
    ClientToken, Instance, ObjectId, TypeTag,
};

/// Errors that can occur while tracking, generating or applying
/// synchronization messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A wire reference names an object the receiving side does not hold
    #[error("Reference to object {object_id} cannot be resolved. The object was never created on this side or has already been deleted")]
    DanglingReference { object_id: ObjectId },

    /// A message targets an object that is not tracked
    #[error("Object {object_id} is not tracked by this session")]
    UnknownObject { object_id: ObjectId },

    /// No agent provider is registered for the type tag
    #[error("No agent provider is registered for type '{type_tag}'")]
    UnregisteredType { type_tag: TypeTag },

    /// The peer sent something it is not allowed to, or malformed data
    #[error("Protocol violation: {reason}")]
    ProtocolViolation { reason: String },

    /// A remote method handler failed
    #[error("Method '{method}' failed: {message}")]
    MethodInvocation { method: String, message: String },

    /// An explicit object id is already held by a different live instance
    #[error("Object id {object_id} is already in use by another instance")]
    DuplicateObjectId { object_id: ObjectId },

    /// An instance already carries a different object id
    #[error("Instance is already bound to object id {bound}, cannot rebind it to {requested}")]
    IdentityConflict { bound: ObjectId, requested: ObjectId },

    /// An id resolved to an instance of a different type
    #[error("Object {object_id} has type '{actual}', expected '{expected}'")]
    TypeMismatch {
        object_id: ObjectId,
        expected: TypeTag,
        actual: TypeTag,
    },

    /// An operation needs a different kind of state than the instance holds
    #[error("Instance of type '{type_tag}' holds {actual} state, operation requires {expected} state")]
    ShapeMismatch {
        type_tag: TypeTag,
        expected: Shape,
        actual: Shape,
    },

    /// A declared type received a property it does not declare
    #[error("Type '{type_tag}' does not declare property '{property}'")]
    UndeclaredProperty { type_tag: TypeTag, property: String },

    /// A method is not declared, has no handler, or is hidden from the caller
    #[error("Type '{type_tag}' has no method '{method}' callable by this peer")]
    UnknownMethod { type_tag: TypeTag, method: String },

    /// The type of an object is not visible to the peer
    #[error("Type '{type_tag}' is not visible to peer {peer}")]
    TypeHidden { type_tag: TypeTag, peer: ClientToken },

    /// The peer was never registered or has been removed
    #[error("Peer {peer} is not registered with this session")]
    UnknownPeer { peer: ClientToken },

    /// The peer went away before answering
    #[error("Peer {peer} disconnected before answering")]
    PeerUnavailable { peer: ClientToken },

    /// A sequence index is past the end
    #[error("Index {index} is out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Splice instructions could not be applied
    #[error("Splice error: {0}")]
    Splice(#[from] SpliceError),

    /// A round could not be carried over the transport
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SyncError {
    pub fn protocol(reason: impl Into<String>) -> Self {
        SyncError::ProtocolViolation {
            reason: reason.into(),
        }
    }

    /// `UnknownObject` for an instance that may never have been given an id
    pub fn unknown_instance(instance: &Instance) -> Self {
        SyncError::UnknownObject {
            object_id: instance
                .object_id()
                .cloned()
                .unwrap_or_else(|| ObjectId::new("<untracked>")),
        }
    }
}
