use crate::{
    codec::{value_decoder::ValueDecoder, value_encoder::ValueEncoder},
    instance::state::InstanceState,
    ledger::reference_scope::ReferenceScope,
    messages::payload::{from_data, to_data, ElementOp},
    Instance, ObjectId, PeerInfo, SyncError, SyncMessage, TypeTag, Value, WireValue,
};

use super::sync_agent::{unexpected_message, with_dirty, SyncAgent};

/// Agent for unordered sets of values
#[derive(Default)]
pub struct SetAgent;

impl SetAgent {
    pub fn new() -> Self {
        Self
    }
}

enum DecodedOp {
    Add(Value),
    Delete(Value),
    Clear,
}

impl SyncAgent for SetAgent {
    fn type_tag(&self, _peer: &PeerInfo) -> Option<TypeTag> {
        Some(TypeTag::set())
    }

    fn generate_messages(
        &mut self,
        object_id: &ObjectId,
        instance: &Instance,
        encoder: &mut ValueEncoder<'_>,
        peer: &PeerInfo,
        is_new_peer: bool,
    ) -> Result<Vec<SyncMessage>, SyncError> {
        let scope = || Some(ReferenceScope::owner(object_id.clone()));

        if is_new_peer {
            let elements = instance
                .elements()?
                .iter()
                .map(|element| encoder.serialize_in(element, scope()))
                .collect::<Result<Vec<WireValue>, SyncError>>()?;
            return Ok(vec![SyncMessage::Create {
                object_id: object_id.clone(),
                type_tag: instance.type_tag().clone(),
                data: to_data(&elements)?,
            }]);
        }

        let ops = with_dirty(instance, peer.token(), |dirty| {
            let mut ops = Vec::new();
            if dirty.was_cleared() {
                ops.push(ElementOp::Clear);
            }
            for element in dirty.elements() {
                if instance.contains(element) {
                    ops.push(ElementOp::Set {
                        value: encoder.serialize_in(element, scope())?,
                    });
                } else if !dirty.was_cleared() {
                    if let Some(value) = encoder.serialize_removed(element)? {
                        ops.push(ElementOp::Delete { value });
                    }
                }
            }
            Ok(ops)
        })?;

        match ops {
            Some(ops) if !ops.is_empty() => Ok(vec![SyncMessage::Change {
                object_id: object_id.clone(),
                data: to_data(&ops)?,
            }]),
            _ => Ok(Vec::new()),
        }
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
                let elements = decoder.deserialize_all(&wire)?;
                instance.replace_state(InstanceState::Set(elements.into_iter().collect()))
            }
            SyncMessage::Change { data, .. } => {
                let ops: Vec<ElementOp> = from_data(data)?;
                let ops = ops
                    .into_iter()
                    .map(|op| {
                        Ok(match op {
                            ElementOp::Set { value } => DecodedOp::Add(decoder.deserialize(&value)?),
                            ElementOp::Delete { value } => {
                                DecodedOp::Delete(decoder.deserialize(&value)?)
                            }
                            ElementOp::Clear => DecodedOp::Clear,
                        })
                    })
                    .collect::<Result<Vec<_>, SyncError>>()?;
                instance.update_state(|state| {
                    let InstanceState::Set(elements) = state else {
                        return Err(unexpected_message(object_id, message));
                    };
                    for op in ops {
                        match op {
                            DecodedOp::Add(value) => {
                                elements.insert(value);
                            }
                            DecodedOp::Delete(value) => {
                                elements.shift_remove(&value);
                            }
                            DecodedOp::Clear => elements.clear(),
                        }
                    }
                    Ok(())
                })
            }
            _ => Err(unexpected_message(object_id, message)),
        }
    }
}
