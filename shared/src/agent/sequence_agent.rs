use std::collections::HashMap;

use crate::{
    codec::{value_decoder::ValueDecoder, value_encoder::ValueEncoder},
    diff::{
        sequence_diff::diff,
        splice::{apply_in_place, validate, SpliceInstruction},
    },
    instance::state::InstanceState,
    ledger::reference_scope::{FieldKey, ReferenceScope},
    messages::payload::{from_data, to_data},
    ClientToken, Instance, ObjectId, PeerInfo, SyncError, SyncMessage, TypeTag, Value, WireValue,
};

use super::sync_agent::{unexpected_message, with_dirty, SyncAgent};

/// Agent for ordered sequences.
///
/// Keeps, per peer, the wire form of the list as last sent; a `Change` is
/// the minimal splice script from that snapshot to the current list.
/// Snapshots hold ids rather than instances so they never keep an object
/// alive.
#[derive(Default)]
pub struct SequenceAgent {
    snapshots: HashMap<ClientToken, Vec<WireValue>>,
}

impl SequenceAgent {
    pub fn new() -> Self {
        Self::default()
    }

    fn encode_items(
        object_id: &ObjectId,
        items: &[Value],
        encoder: &mut ValueEncoder<'_>,
    ) -> Result<Vec<WireValue>, SyncError> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                encoder.serialize_in(
                    item,
                    Some(ReferenceScope::field(object_id.clone(), FieldKey::Index(index))),
                )
            })
            .collect()
    }

    fn create(
        &mut self,
        object_id: &ObjectId,
        instance: &Instance,
        encoder: &mut ValueEncoder<'_>,
        peer: &ClientToken,
    ) -> Result<Vec<SyncMessage>, SyncError> {
        let wire = Self::encode_items(object_id, &instance.items()?, encoder)?;
        let data = to_data(&wire)?;
        self.snapshots.insert(peer.clone(), wire);
        Ok(vec![SyncMessage::Create {
            object_id: object_id.clone(),
            type_tag: instance.type_tag().clone(),
            data,
        }])
    }
}

impl SyncAgent for SequenceAgent {
    fn type_tag(&self, _peer: &PeerInfo) -> Option<TypeTag> {
        Some(TypeTag::sequence())
    }

    fn generate_messages(
        &mut self,
        object_id: &ObjectId,
        instance: &Instance,
        encoder: &mut ValueEncoder<'_>,
        peer: &PeerInfo,
        is_new_peer: bool,
    ) -> Result<Vec<SyncMessage>, SyncError> {
        let token = peer.token();
        if is_new_peer || !self.snapshots.contains_key(token) {
            return self.create(object_id, instance, encoder, token);
        }

        let snapshots = &mut self.snapshots;
        let messages = with_dirty(instance, token, |_| {
            let current = Self::encode_items(object_id, &instance.items()?, encoder)?;
            let previous = snapshots.get(token).map(Vec::as_slice).unwrap_or_default();
            let edits = diff(previous, &current);
            if edits.is_empty() {
                return Ok(Vec::new());
            }
            let data = to_data(&edits)?;
            snapshots.insert(token.clone(), current);
            Ok(vec![SyncMessage::Change {
                object_id: object_id.clone(),
                data,
            }])
        })?;

        Ok(messages.unwrap_or_default())
    }

    fn apply_message(
        &mut self,
        object_id: &ObjectId,
        instance: &Instance,
        message: &SyncMessage,
        decoder: &ValueDecoder<'_>,
        _peer: &PeerInfo,
    ) -> Result<(), SyncError> {
        match message {
            SyncMessage::Create { data, .. } => {
                let wire: Vec<WireValue> = from_data(data)?;
                let items = decoder.deserialize_all(&wire)?;
                instance.replace_state(InstanceState::Sequence(items))
            }
            SyncMessage::Change { data, .. } => {
                let edits: Vec<SpliceInstruction<WireValue>> = from_data(data)?;
                validate(instance.len(), &edits)?;
                let edits = edits
                    .into_iter()
                    .map(|edit| edit.try_map(|wire| decoder.deserialize(&wire)))
                    .collect::<Result<Vec<_>, _>>()?;
                instance.update_state(|state| match state {
                    InstanceState::Sequence(items) => Ok(apply_in_place(items, edits)?),
                    _ => Err(unexpected_message(object_id, message)),
                })
            }
            _ => Err(unexpected_message(object_id, message)),
        }
    }

    fn forget_peer(&mut self, peer: &ClientToken) {
        self.snapshots.remove(peer);
    }
}
