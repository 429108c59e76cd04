use serde::{Deserialize, Serialize};

use crate::{ObjectId, TypeTag};

/// Pointer-like payload standing in for an object on the wire
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireReference {
    pub object_id: ObjectId,
    #[serde(rename = "typeId")]
    pub type_tag: TypeTag,
}

impl WireReference {
    pub fn new(object_id: ObjectId, type_tag: TypeTag) -> Self {
        Self {
            object_id,
            type_tag,
        }
    }
}

/// Wire-safe representation of a [`Value`](crate::Value): primitives pass
/// through, objects become references.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Ref(WireReference),
}

impl WireValue {
    pub fn reference(&self) -> Option<&WireReference> {
        match self {
            WireValue::Ref(reference) => Some(reference),
            _ => None,
        }
    }
}

impl PartialEq for WireValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (WireValue::Null, WireValue::Null) => true,
            (WireValue::Bool(a), WireValue::Bool(b)) => a == b,
            (WireValue::Int(a), WireValue::Int(b)) => a == b,
            (WireValue::Float(a), WireValue::Float(b)) => a.to_bits() == b.to_bits(),
            (WireValue::Str(a), WireValue::Str(b)) => a == b,
            (WireValue::Ref(a), WireValue::Ref(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for WireValue {}
