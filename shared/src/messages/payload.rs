//! Typed forms of the `data` carried by `Create` and `Change` messages

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{Key, SyncError, WireValue};

/// One edit of a map
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EntryOp {
    Set { key: Key, value: WireValue },
    Delete { key: Key },
    Clear,
}

/// One edit of a set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ElementOp {
    Set { value: WireValue },
    Delete { value: WireValue },
    Clear,
}

/// Full contents of a map, as `[[key, value], ...]`
pub type MapEntries = Vec<(Key, WireValue)>;

pub fn to_data<T: Serialize>(payload: &T) -> Result<serde_json::Value, SyncError> {
    serde_json::to_value(payload)
        .map_err(|error| SyncError::protocol(format!("payload could not be encoded: {}", error)))
}

pub fn from_data<T: DeserializeOwned>(data: &serde_json::Value) -> Result<T, SyncError> {
    T::deserialize(data)
        .map_err(|error| SyncError::protocol(format!("malformed payload: {}", error)))
}
