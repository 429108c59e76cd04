//! Shared encoding for agents whose state is a set of named fields

use indexmap::IndexMap;

use crate::{
    codec::{value_decoder::ValueDecoder, value_encoder::ValueEncoder},
    ledger::reference_scope::{FieldKey, ReferenceScope},
    ObjectId, SyncError, Value, WireValue,
};

/// `data` of a field-based `Create` or `Change`: `{field: value}`
pub type FieldData = IndexMap<String, WireValue>;

pub fn encode_field(
    encoder: &mut ValueEncoder<'_>,
    object_id: &ObjectId,
    name: &str,
    value: &Value,
) -> Result<WireValue, SyncError> {
    encoder.serialize_in(
        value,
        Some(ReferenceScope::field(
            object_id.clone(),
            FieldKey::Name(name.to_string()),
        )),
    )
}

pub fn decode_fields(
    decoder: &ValueDecoder<'_>,
    data: FieldData,
) -> Result<Vec<(String, Value)>, SyncError> {
    data.into_iter()
        .map(|(name, wire)| decoder.deserialize(&wire).map(|value| (name, value)))
        .collect()
}
