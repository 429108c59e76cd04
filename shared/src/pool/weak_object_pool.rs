use std::collections::HashMap;

use indexmap::IndexSet;
use log::info;

use crate::{ClientToken, Instance, ObjectId, SyncError, TypeTag, WeakInstance};

use super::{
    graveyard::Graveyard,
    object_lookup::ObjectLookup,
    pool_index::{Inserted, PoolIndex},
};

/// An object whose last strong handle was dropped
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finalized {
    pub object_id: ObjectId,
    pub type_tag: TypeTag,
    /// Peers that had been sent the object and must be told it is gone
    pub known_by: Vec<ClientToken>,
}

/// Pool holding weak links, used by the host so that tracking an object never
/// keeps it alive.
///
/// Dropped instances are reported through a graveyard and removed by
/// [`WeakObjectPool::collect_finalized`] at the start of the next round.
#[derive(Default)]
pub struct WeakObjectPool {
    index: PoolIndex<WeakInstance>,
    graveyard: Graveyard,
    known_by: HashMap<ObjectId, IndexSet<ClientToken>>,
}

impl WeakObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        instance: &Instance,
        object_id: &ObjectId,
        type_tag: &TypeTag,
    ) -> Result<bool, SyncError> {
        let inserted = self.index.insert(instance, object_id, type_tag)?;
        if inserted == Inserted::New {
            instance.add_graveyard(self.graveyard.clone());
        }
        Ok(inserted == Inserted::New)
    }

    /// Removes an object, returning the peers that knew it
    pub fn remove(&mut self, object_id: &ObjectId) -> Option<Vec<ClientToken>> {
        self.index.remove(object_id)?;
        Some(
            self.known_by
                .remove(object_id)
                .map(|peers| peers.into_iter().collect())
                .unwrap_or_default(),
        )
    }

    pub fn mark_known(&mut self, object_id: &ObjectId, peer: &ClientToken) {
        if self.index.contains(object_id) {
            self.known_by
                .entry(object_id.clone())
                .or_default()
                .insert(peer.clone());
        }
    }

    pub fn mark_unknown(&mut self, object_id: &ObjectId, peer: &ClientToken) {
        if let Some(peers) = self.known_by.get_mut(object_id) {
            peers.shift_remove(peer);
            if peers.is_empty() {
                self.known_by.remove(object_id);
            }
        }
    }

    pub fn known_by(&self, object_id: &ObjectId) -> Vec<ClientToken> {
        self.known_by
            .get(object_id)
            .map(|peers| peers.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn forget_peer(&mut self, peer: &ClientToken) {
        self.known_by.retain(|_, peers| {
            peers.shift_remove(peer);
            !peers.is_empty()
        });
    }

    pub fn has_pending_finalizations(&self) -> bool {
        !self.graveyard.is_empty()
    }

    /// Removes every entry whose instance has been dropped since the last
    /// call
    pub fn collect_finalized(&mut self) -> Vec<Finalized> {
        let mut finalized = Vec::new();
        for object_id in self.graveyard.drain() {
            let Some(entry) = self.index.get(&object_id) else {
                continue;
            };
            // the id was reused by a live instance after the drop
            if entry.handle.is_alive() {
                continue;
            }
            let type_tag = entry.type_tag.clone();
            self.index.remove(&object_id);
            let known_by = self
                .known_by
                .remove(&object_id)
                .map(|peers| peers.into_iter().collect())
                .unwrap_or_default();
            info!("Object {} of type '{}' was finalized", object_id, type_tag);
            finalized.push(Finalized {
                object_id,
                type_tag,
                known_by,
            });
        }
        finalized
    }
}

impl ObjectLookup for WeakObjectPool {
    fn find_by_id(&self, object_id: &ObjectId) -> Option<Instance> {
        self.index.find_by_id(object_id)
    }

    fn find_by_instance(&self, instance: &Instance) -> Option<ObjectId> {
        self.index.find_by_instance(instance)
    }

    fn find_by_type(&self, predicate: &dyn Fn(&TypeTag) -> bool) -> Vec<(ObjectId, Instance)> {
        self.index.find_by_type(predicate)
    }

    fn contains(&self, object_id: &ObjectId) -> bool {
        self.index.contains(object_id)
    }

    fn type_tag_of(&self, object_id: &ObjectId) -> Option<TypeTag> {
        self.index.type_tag_of(object_id)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn ids(&self) -> Vec<ObjectId> {
        self.index.ids()
    }
}
