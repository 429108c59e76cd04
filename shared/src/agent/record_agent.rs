use std::sync::Arc;

use crate::{
    codec::{value_decoder::ValueDecoder, value_encoder::ValueEncoder},
    instance::state::InstanceState,
    messages::payload::{from_data, to_data},
    Instance, InvokeMode, MethodFuture, ObjectId, PeerInfo, SyncError, SyncMessage,
    TypeDescriptor, TypeTag, Value,
};

use super::{
    fields::{decode_fields, encode_field, FieldData},
    sync_agent::{unexpected_message, with_dirty, SyncAgent},
};

/// Agent for user types declared with a [`TypeDescriptor`]
pub struct RecordAgent {
    descriptor: Arc<TypeDescriptor>,
}

impl RecordAgent {
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    fn is_visible(&self, name: &str, peer: &PeerInfo) -> bool {
        self.descriptor
            .property(name)
            .map(|property| property.visibility().allows(peer))
            .unwrap_or(false)
    }

    fn check_declared(&self, data: &FieldData) -> Result<(), SyncError> {
        match data
            .keys()
            .find(|name| self.descriptor.property(name).is_none())
        {
            Some(name) => Err(SyncError::protocol(format!(
                "type '{}' does not declare property '{}'",
                self.descriptor.type_tag(),
                name
            ))),
            None => Ok(()),
        }
    }

    fn run_hooks(&self, instance: &Instance, applied: &[(String, Value)]) {
        for (name, value) in applied {
            let hook = self
                .descriptor
                .property(name)
                .and_then(|property| property.change_hook());
            if let Some(hook) = hook {
                hook(instance, value);
            }
        }
    }
}

impl SyncAgent for RecordAgent {
    fn type_tag(&self, peer: &PeerInfo) -> Option<TypeTag> {
        if self.descriptor.is_visible_to(peer) {
            Some(self.descriptor.type_tag().clone())
        } else {
            None
        }
    }

    fn generate_messages(
        &mut self,
        object_id: &ObjectId,
        instance: &Instance,
        encoder: &mut ValueEncoder<'_>,
        peer: &PeerInfo,
        is_new_peer: bool,
    ) -> Result<Vec<SyncMessage>, SyncError> {
        if !self.descriptor.is_visible_to(peer) {
            return Err(SyncError::TypeHidden {
                type_tag: self.descriptor.type_tag().clone(),
                peer: peer.token().clone(),
            });
        }

        if is_new_peer {
            let mut data = FieldData::new();
            for property in self.descriptor.visible_properties(peer) {
                let value = instance.get(property.name()).unwrap_or_default();
                let wire = encode_field(encoder, object_id, property.name(), &value)?;
                data.insert(property.name().to_string(), wire);
            }
            return Ok(vec![SyncMessage::Create {
                object_id: object_id.clone(),
                type_tag: self.descriptor.type_tag().clone(),
                data: to_data(&data)?,
            }]);
        }

        let data = with_dirty(instance, peer.token(), |dirty| {
            let mut data = FieldData::new();
            for name in dirty.fields().filter(|name| self.is_visible(name, peer)) {
                let value = instance.get(name).unwrap_or_default();
                data.insert(name.to_string(), encode_field(encoder, object_id, name, &value)?);
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
        let (data, replace) = match message {
            SyncMessage::Create { data, .. } => (data, true),
            SyncMessage::Change { data, .. } => (data, false),
            _ => return Err(unexpected_message(object_id, message)),
        };
        let data: FieldData = from_data(data)?;
        self.check_declared(&data)?;
        let applied = decode_fields(decoder, data)?;

        if replace {
            let mut fields = self
                .descriptor
                .properties()
                .iter()
                .map(|property| (property.name().to_string(), Value::Null))
                .collect::<indexmap::IndexMap<_, _>>();
            fields.extend(applied.iter().cloned());
            instance.replace_state(InstanceState::Fields(fields))?;
        } else {
            instance.update_state(|state| match state {
                InstanceState::Fields(fields) => {
                    fields.extend(applied.iter().cloned());
                    Ok(())
                }
                _ => Err(unexpected_message(object_id, message)),
            })?;
        }

        self.run_hooks(instance, &applied);
        Ok(())
    }

    fn invoke(
        &mut self,
        instance: &Instance,
        method: &str,
        args: Vec<Value>,
        peer: &PeerInfo,
    ) -> Result<MethodFuture, SyncError> {
        let handler = self
            .descriptor
            .method(method)
            .filter(|descriptor| descriptor.visibility().allows(peer))
            .and_then(|descriptor| descriptor.method_handler())
            .ok_or_else(|| SyncError::UnknownMethod {
                type_tag: self.descriptor.type_tag().clone(),
                method: method.to_string(),
            })?;
        Ok(handler(instance.clone(), args))
    }

    fn invoke_mode(&self, method: &str) -> Option<InvokeMode> {
        self.descriptor
            .method(method)
            .map(|descriptor| descriptor.invoke_mode())
    }
}
