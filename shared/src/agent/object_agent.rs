use crate::{
    codec::{value_decoder::ValueDecoder, value_encoder::ValueEncoder},
    instance::state::InstanceState,
    messages::payload::{from_data, to_data},
    Instance, ObjectId, PeerInfo, SyncError, SyncMessage, TypeTag,
};

use super::{
    fields::{decode_fields, encode_field, FieldData},
    sync_agent::{unexpected_message, with_dirty, SyncAgent},
};

/// Agent for plain objects: any string-keyed field may be set
#[derive(Default)]
pub struct ObjectAgent;

impl ObjectAgent {
    pub fn new() -> Self {
        Self
    }
}

impl SyncAgent for ObjectAgent {
    fn type_tag(&self, _peer: &PeerInfo) -> Option<TypeTag> {
        Some(TypeTag::object())
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
            let mut data = FieldData::new();
            for (name, value) in instance.fields()? {
                let wire = encode_field(encoder, object_id, &name, &value)?;
                data.insert(name, wire);
            }
            return Ok(vec![SyncMessage::Create {
                object_id: object_id.clone(),
                type_tag: instance.type_tag().clone(),
                data: to_data(&data)?,
            }]);
        }

        let data = with_dirty(instance, peer.token(), |dirty| {
            let mut data = FieldData::new();
            for name in dirty.fields() {
                if let Some(value) = instance.get(name) {
                    data.insert(name.to_string(), encode_field(encoder, object_id, name, &value)?);
                }
            }
            Ok(data)
        })?;

        match data {
            Some(data) if !data.is_empty() => Ok(vec![SyncMessage::Change {
                object_id: object_id.clone(),
                data: to_data(&data)?,
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
                let fields = decode_fields(decoder, from_data(data)?)?;
                instance.replace_state(InstanceState::Fields(fields.into_iter().collect()))
            }
            SyncMessage::Change { data, .. } => {
                let fields = decode_fields(decoder, from_data(data)?)?;
                instance.update_state(|state| match state {
                    InstanceState::Fields(current) => {
                        current.extend(fields);
                        Ok(())
                    }
                    _ => Err(unexpected_message(object_id, message)),
                })
            }
            _ => Err(unexpected_message(object_id, message)),
        }
    }
}
