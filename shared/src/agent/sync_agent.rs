use crate::{
    codec::{value_decoder::ValueDecoder, value_encoder::ValueEncoder},
    instance::dirty_set::DirtySet,
    ClientToken, Instance, InvokeMode, MethodFuture, ObjectId, PeerInfo, SyncError, SyncMessage,
    TypeTag, Value,
};

/// Per-object adapter between a live instance and the wire.
///
/// The session owns exactly one agent per tracked object. Agents keep
/// whatever per-peer state they need to produce incremental updates.
pub trait SyncAgent: Send {
    /// Tag sent in `Create`, or `None` if the object is hidden from `peer`
    fn type_tag(&self, peer: &PeerInfo) -> Option<TypeTag>;

    /// Produces this round's messages for `peer`: a `Create` if the peer
    /// holds no current description, otherwise at most one `Change`
    fn generate_messages(
        &mut self,
        object_id: &ObjectId,
        instance: &Instance,
        encoder: &mut ValueEncoder<'_>,
        peer: &PeerInfo,
        is_new_peer: bool,
    ) -> Result<Vec<SyncMessage>, SyncError>;

    /// Applies a `Create` or `Change`. Payloads are fully decoded before the
    /// instance is touched.
    fn apply_message(
        &mut self,
        object_id: &ObjectId,
        instance: &Instance,
        message: &SyncMessage,
        decoder: &ValueDecoder<'_>,
        peer: &PeerInfo,
    ) -> Result<(), SyncError>;

    /// Starts a method call received from `peer`
    fn invoke(
        &mut self,
        instance: &Instance,
        method: &str,
        _args: Vec<Value>,
        _peer: &PeerInfo,
    ) -> Result<MethodFuture, SyncError> {
        Err(SyncError::UnknownMethod {
            type_tag: instance.type_tag().clone(),
            method: method.to_string(),
        })
    }

    /// How calls to `method` are answered, or `None` if there is no such
    /// method
    fn invoke_mode(&self, _method: &str) -> Option<InvokeMode> {
        None
    }

    fn forget_peer(&mut self, _peer: &ClientToken) {}
}

/// Runs `f` over what changed for `peer` since the last round.
///
/// Returns `Ok(None)` when nothing changed. If `f` fails the changes are put
/// back so the next round retries them.
pub fn with_dirty<R>(
    instance: &Instance,
    peer: &ClientToken,
    f: impl FnOnce(&DirtySet) -> Result<R, SyncError>,
) -> Result<Option<R>, SyncError> {
    let dirty = instance.take_dirty(peer);
    if dirty.is_clear() {
        return Ok(None);
    }
    match f(&dirty) {
        Ok(output) => Ok(Some(output)),
        Err(error) => {
            instance.restore_dirty(peer, &dirty);
            Err(error)
        }
    }
}

pub(crate) fn unexpected_message(object_id: &ObjectId, message: &SyncMessage) -> SyncError {
    SyncError::protocol(format!(
        "agent for {} cannot apply a {} message",
        object_id,
        message.kind_name()
    ))
}
