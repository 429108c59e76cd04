use serde::{Deserialize, Serialize};

use crate::{CorrelationId, ObjectId, TypeTag, WireValue};

/// A single unit of the replication protocol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SyncMessage {
    /// Full description of an object the peer does not hold yet
    #[serde(rename_all = "camelCase")]
    Create {
        object_id: ObjectId,
        #[serde(rename = "typeId")]
        type_tag: TypeTag,
        data: serde_json::Value,
    },
    /// Incremental update of an object the peer already holds
    #[serde(rename_all = "camelCase")]
    Change {
        object_id: ObjectId,
        data: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    Delete { object_id: ObjectId },
    /// Remote method call
    #[serde(rename_all = "camelCase")]
    Invoke {
        object_id: ObjectId,
        method: String,
        args: Vec<WireValue>,
        correlation_id: CorrelationId,
    },
    /// Answer to an `Invoke`
    Result(MethodResultMessage),
}

impl SyncMessage {
    /// Object the message targets, if any
    pub fn object_id(&self) -> Option<&ObjectId> {
        match self {
            SyncMessage::Create { object_id, .. }
            | SyncMessage::Change { object_id, .. }
            | SyncMessage::Delete { object_id }
            | SyncMessage::Invoke { object_id, .. } => Some(object_id),
            SyncMessage::Result(_) => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SyncMessage::Create { .. } => "create",
            SyncMessage::Change { .. } => "change",
            SyncMessage::Delete { .. } => "delete",
            SyncMessage::Invoke { .. } => "invoke",
            SyncMessage::Result(_) => "result",
        }
    }
}

/// Outcome of a remote method call. A result with neither value nor error
/// is a successful call returning null.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodResultMessage {
    pub correlation_id: CorrelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MethodResultMessage {
    pub fn success(correlation_id: CorrelationId, value: WireValue) -> Self {
        Self {
            correlation_id,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(correlation_id: CorrelationId, error: impl Into<String>) -> Self {
        Self {
            correlation_id,
            value: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
