use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::ObjectId;

use super::reference_scope::ReferenceScope;

/// What one peer has been told about one object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeerReferenceState {
    pub full_description_sent: bool,
}

/// Per-peer record of which objects the peer holds and whether their full
/// description is current.
///
/// An entry means the peer holds the object. A stale entry (description not
/// current) gets a full `Create` on the next round; a missing entry means a
/// reference to the object must be introduced before it can be used.
#[derive(Debug, Default)]
pub struct ReferenceLedger {
    entries: IndexMap<ObjectId, PeerReferenceState>,
    scopes: HashMap<ReferenceScope, IndexSet<ObjectId>>,
}

impl ReferenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known(&self, object_id: &ObjectId) -> bool {
        self.entries.contains_key(object_id)
    }

    pub fn is_described(&self, object_id: &ObjectId) -> bool {
        self.entries
            .get(object_id)
            .map(|state| state.full_description_sent)
            .unwrap_or(false)
    }

    pub fn state(&self, object_id: &ObjectId) -> Option<PeerReferenceState> {
        self.entries.get(object_id).copied()
    }

    /// Puts back a state captured with [`ReferenceLedger::state`], used when
    /// a description could not be generated after all
    pub fn restore(&mut self, object_id: &ObjectId, state: Option<PeerReferenceState>) {
        match state {
            Some(state) => {
                self.entries.insert(object_id.clone(), state);
            }
            None => {
                self.entries.shift_remove(object_id);
            }
        }
    }

    /// Marks the object as fully described, returning true if it was not
    /// before
    pub fn mark_described(&mut self, object_id: &ObjectId) -> bool {
        let state = self.entries.entry(object_id.clone()).or_default();
        let newly = !state.full_description_sent;
        state.full_description_sent = true;
        newly
    }

    pub fn mark_stale(&mut self, object_id: &ObjectId) {
        if let Some(state) = self.entries.get_mut(object_id) {
            state.full_description_sent = false;
        }
    }

    pub fn record_scope(&mut self, scope: ReferenceScope, object_id: &ObjectId) {
        self.scopes
            .entry(scope)
            .or_default()
            .insert(object_id.clone());
    }

    /// Drops everything known about the object, as after a `Delete`
    pub fn forget(&mut self, object_id: &ObjectId) {
        self.entries.shift_remove(object_id);
        self.scopes.retain(|scope, ids| {
            ids.shift_remove(object_id);
            scope.owner != *object_id && !ids.is_empty()
        });
    }

    /// Marks the objects recorded under `scope` stale, or every object when
    /// no scope is given. Returns how many objects were marked.
    pub fn clear_stored_references(&mut self, scope: Option<&ReferenceScope>) -> usize {
        let Some(scope) = scope else {
            let count = self.entries.len();
            for state in self.entries.values_mut() {
                state.full_description_sent = false;
            }
            self.scopes.clear();
            return count;
        };

        let mut cleared = IndexSet::new();
        self.scopes.retain(|recorded, ids| {
            if scope.covers(recorded) {
                cleared.extend(ids.drain(..));
                false
            } else {
                true
            }
        });
        let mut count = 0;
        for object_id in cleared.iter() {
            if let Some(state) = self.entries.get_mut(object_id) {
                state.full_description_sent = false;
                count += 1;
            }
        }
        count
    }

    pub fn known_ids(&self) -> Vec<ObjectId> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.scopes.clear();
    }
}
