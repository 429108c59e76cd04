use tether_shared::{ObjectId, SyncMessage};

/// Wire names of the messages, in order
pub fn kinds(messages: &[SyncMessage]) -> Vec<&'static str> {
    messages.iter().map(SyncMessage::kind_name).collect()
}

/// Ids of the objects created by `messages`, in order
pub fn creates_of(messages: &[SyncMessage]) -> Vec<ObjectId> {
    messages
        .iter()
        .filter_map(|message| match message {
            SyncMessage::Create { object_id, .. } => Some(object_id.clone()),
            _ => None,
        })
        .collect()
}

/// `Change` payloads of `object_id`
pub fn changes_of(messages: &[SyncMessage], object_id: &ObjectId) -> Vec<serde_json::Value> {
    messages
        .iter()
        .filter_map(|message| match message {
            SyncMessage::Change {
                object_id: changed,
                data,
            } if changed == object_id => Some(data.clone()),
            _ => None,
        })
        .collect()
}

pub fn deletes(messages: &[SyncMessage]) -> Vec<ObjectId> {
    messages
        .iter()
        .filter_map(|message| match message {
            SyncMessage::Delete { object_id } => Some(object_id.clone()),
            _ => None,
        })
        .collect()
}
