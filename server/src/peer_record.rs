use indexmap::IndexSet;

use tether_shared::{
    Instance, Invocations, ObjectId, PeerInfo, ReferenceLedger, SyncMessage,
};

/// Everything the host keeps about one registered peer
pub struct PeerRecord {
    pub info: PeerInfo,
    pub ledger: ReferenceLedger,
    /// Roots in this peer's scope
    pub scope: IndexSet<ObjectId>,
    pub pending_deletes: IndexSet<ObjectId>,
    /// Objects introduced outside a round (by method arguments or results).
    /// Held strongly so they live until their `Create` is generated.
    pub pending_introduced: Vec<(ObjectId, Instance)>,
    /// Results and invocations to send after this round's object messages
    pub outbox: Vec<SyncMessage>,
    pub invocations: Invocations,
}

impl PeerRecord {
    pub fn new(info: PeerInfo) -> Self {
        let invocations = Invocations::new(info.token().clone());
        Self {
            info,
            ledger: ReferenceLedger::new(),
            scope: IndexSet::new(),
            pending_deletes: IndexSet::new(),
            pending_introduced: Vec::new(),
            outbox: Vec::new(),
            invocations,
        }
    }

    /// Stops telling this peer about `object_id` and queues its `Delete`
    pub fn queue_delete(&mut self, object_id: &ObjectId) {
        if self.ledger.is_known(object_id) {
            self.ledger.forget(object_id);
            self.pending_deletes.insert(object_id.clone());
        }
        self.pending_introduced
            .retain(|(introduced, _)| introduced != object_id);
    }
}
