use crate::{
    ledger::{
        reference_ledger::{PeerReferenceState, ReferenceLedger},
        reference_scope::ReferenceScope,
    },
    Instance, ObjectId, SyncError, Value, WireReference, WireValue,
};

use super::object_tracker::ObjectTracker;

/// Serializes live values for one peer.
///
/// Objects are always written as references. When a ledger is attached, any
/// object the peer does not hold a current description of is marked as
/// described right away and queued in [`ValueEncoder::take_introduced`], so
/// the caller can send its `Create` in the same round. Marking first means
/// an object reachable from itself is only ever introduced once.
pub struct ValueEncoder<'a> {
    tracker: &'a mut dyn ObjectTracker,
    ledger: Option<&'a mut ReferenceLedger>,
    introduced: Vec<(ObjectId, Instance)>,
    previous: Vec<(ObjectId, Option<PeerReferenceState>)>,
}

impl<'a> ValueEncoder<'a> {
    pub fn new(tracker: &'a mut dyn ObjectTracker, ledger: Option<&'a mut ReferenceLedger>) -> Self {
        Self {
            tracker,
            ledger,
            introduced: Vec::new(),
            previous: Vec::new(),
        }
    }

    pub fn serialize(&mut self, value: &Value) -> Result<WireValue, SyncError> {
        self.serialize_in(value, None)
    }

    /// Serializes `value`, recording object references under `scope`
    pub fn serialize_in(
        &mut self,
        value: &Value,
        scope: Option<ReferenceScope>,
    ) -> Result<WireValue, SyncError> {
        Ok(match value {
            Value::Null => WireValue::Null,
            Value::Bool(value) => WireValue::Bool(*value),
            Value::Int(value) => WireValue::Int(*value),
            Value::Float(value) => WireValue::Float(*value),
            Value::Str(value) => WireValue::Str(value.clone()),
            Value::Object(instance) => {
                let object_id = self.tracker.resolve_or_track(instance)?;
                if let Some(ledger) = self.ledger.as_deref_mut() {
                    if let Some(scope) = scope {
                        ledger.record_scope(scope, &object_id);
                    }
                    let previous = ledger.state(&object_id);
                    if ledger.mark_described(&object_id) {
                        self.previous.push((object_id.clone(), previous));
                        self.introduced.push((object_id.clone(), instance.clone()));
                    }
                }
                WireValue::Ref(WireReference::new(object_id, instance.type_tag().clone()))
            }
        })
    }

    /// Serializes a value that is being removed from the peer's copy.
    ///
    /// Returns `None` for an object the peer never received, since it cannot
    /// hold it either.
    pub fn serialize_removed(&mut self, value: &Value) -> Result<Option<WireValue>, SyncError> {
        let Value::Object(instance) = value else {
            return self.serialize(value).map(Some);
        };
        let Some(object_id) = self.tracker.lookup(instance) else {
            return Ok(None);
        };
        if let Some(ledger) = self.ledger.as_deref() {
            if !ledger.is_known(&object_id) {
                return Ok(None);
            }
        }
        Ok(Some(WireValue::Ref(WireReference::new(
            object_id,
            instance.type_tag().clone(),
        ))))
    }

    pub fn serialize_all(&mut self, values: &[Value]) -> Result<Vec<WireValue>, SyncError> {
        values.iter().map(|value| self.serialize(value)).collect()
    }

    /// Objects introduced since the last call, in discovery order
    pub fn take_introduced(&mut self) -> Vec<(ObjectId, Instance)> {
        self.previous.clear();
        std::mem::take(&mut self.introduced)
    }

    /// Undoes the introductions made since the last [`take_introduced`], for
    /// output that is about to be discarded
    ///
    /// [`take_introduced`]: ValueEncoder::take_introduced
    pub fn revert_introduced(&mut self) {
        self.introduced.clear();
        let previous = std::mem::take(&mut self.previous);
        if let Some(ledger) = self.ledger.as_deref_mut() {
            for (object_id, state) in previous.into_iter().rev() {
                ledger.restore(&object_id, state);
            }
        }
    }
}
