use crate::{pool::object_lookup::ObjectLookup, SyncError, Value, WireValue};

/// Turns wire values back into live values, resolving references through a
/// pool
pub struct ValueDecoder<'a> {
    lookup: &'a dyn ObjectLookup,
}

impl<'a> ValueDecoder<'a> {
    pub fn new(lookup: &'a dyn ObjectLookup) -> Self {
        Self { lookup }
    }

    pub fn lookup(&self) -> &dyn ObjectLookup {
        self.lookup
    }

    pub fn deserialize(&self, wire: &WireValue) -> Result<Value, SyncError> {
        Ok(match wire {
            WireValue::Null => Value::Null,
            WireValue::Bool(value) => Value::Bool(*value),
            WireValue::Int(value) => Value::Int(*value),
            WireValue::Float(value) => Value::Float(*value),
            WireValue::Str(value) => Value::Str(value.clone()),
            WireValue::Ref(reference) => {
                let instance = self.lookup.find_by_id(&reference.object_id).ok_or_else(|| {
                    SyncError::DanglingReference {
                        object_id: reference.object_id.clone(),
                    }
                })?;
                if instance.type_tag() != &reference.type_tag {
                    return Err(SyncError::protocol(format!(
                        "reference to {} claims type '{}' but the object has type '{}'",
                        reference.object_id,
                        reference.type_tag,
                        instance.type_tag()
                    )));
                }
                Value::Object(instance)
            }
        })
    }

    pub fn deserialize_all(&self, wires: &[WireValue]) -> Result<Vec<Value>, SyncError> {
        wires.iter().map(|wire| self.deserialize(wire)).collect()
    }
}
