use crate::{
    codec::{value_decoder::ValueDecoder, value_encoder::ValueEncoder},
    instance::state::InstanceState,
    ledger::reference_scope::{FieldKey, ReferenceScope},
    messages::payload::{from_data, to_data, EntryOp, MapEntries},
    Instance, Key, ObjectId, PeerInfo, SyncError, SyncMessage, TypeTag, Value,
};

use super::sync_agent::{unexpected_message, with_dirty, SyncAgent};

/// Agent for keyed maps. Changes are sent as a list of entry operations.
#[derive(Default)]
pub struct MapAgent;

impl MapAgent {
    pub fn new() -> Self {
        Self
    }
}

enum DecodedOp {
    Set(Key, Value),
    Delete(Key),
    Clear,
}

fn entry_scope(object_id: &ObjectId, key: &Key) -> Option<ReferenceScope> {
    Some(ReferenceScope::field(
        object_id.clone(),
        FieldKey::Entry(key.clone()),
    ))
}

impl SyncAgent for MapAgent {
    fn type_tag(&self, _peer: &PeerInfo) -> Option<TypeTag> {
        Some(TypeTag::map())
    }

    fn generate_messages(
        &mut self,
        object_id: &ObjectId,
        instance: &Instance,
        encoder: &mut ValueEncoder<'_>,
        peer: &PeerInfo,
        is_new_peer: bool,
    ) -> Result<Vec<SyncMessage>, SyncError> {
        if is_new_peer {
            let mut entries = MapEntries::new();
            for (key, value) in instance.entries()? {
                let wire = encoder.serialize_in(&value, entry_scope(object_id, &key))?;
                entries.push((key, wire));
            }
            return Ok(vec![SyncMessage::Create {
                object_id: object_id.clone(),
                type_tag: instance.type_tag().clone(),
                data: to_data(&entries)?,
            }]);
        }

        let ops = with_dirty(instance, peer.token(), |dirty| {
            let mut ops = Vec::new();
            if dirty.was_cleared() {
                ops.push(EntryOp::Clear);
            }
            for key in dirty.entries() {
                match instance.entry(key) {
                    Some(value) => ops.push(EntryOp::Set {
                        key: key.clone(),
                        value: encoder.serialize_in(&value, entry_scope(object_id, key))?,
                    }),
                    // a clear already removed it
                    None if dirty.was_cleared() => {}
                    None => ops.push(EntryOp::Delete { key: key.clone() }),
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
                let entries: MapEntries = from_data(data)?;
                let entries = entries
                    .into_iter()
                    .map(|(key, wire)| decoder.deserialize(&wire).map(|value| (key, value)))
                    .collect::<Result<_, SyncError>>()?;
                instance.replace_state(InstanceState::Map(entries))
            }
            SyncMessage::Change { data, .. } => {
                let ops: Vec<EntryOp> = from_data(data)?;
                let ops = ops
                    .into_iter()
                    .map(|op| {
                        Ok(match op {
                            EntryOp::Set { key, value } => {
                                DecodedOp::Set(key, decoder.deserialize(&value)?)
                            }
                            EntryOp::Delete { key } => DecodedOp::Delete(key),
                            EntryOp::Clear => DecodedOp::Clear,
                        })
                    })
                    .collect::<Result<Vec<_>, SyncError>>()?;
                instance.update_state(|state| {
                    let InstanceState::Map(entries) = state else {
                        return Err(unexpected_message(object_id, message));
                    };
                    for op in ops {
                        match op {
                            DecodedOp::Set(key, value) => {
                                entries.insert(key, value);
                            }
                            DecodedOp::Delete(key) => {
                                entries.shift_remove(&key);
                            }
                            DecodedOp::Clear => entries.clear(),
                        }
                    }
                    Ok(())
                })
            }
            _ => Err(unexpected_message(object_id, message)),
        }
    }
}
