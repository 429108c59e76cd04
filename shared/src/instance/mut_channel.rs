use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::ClientToken;

use super::dirty_set::{DirtyKey, DirtySet};

/// A single mutation reported by an instance
#[derive(Clone, Debug)]
pub enum Mutation {
    Key(DirtyKey),
    Cleared,
    Touched,
}

// MutChannel
/// Fans mutations of one instance out to a receiver per watching peer
#[derive(Default)]
pub struct MutChannel {
    receivers: RwLock<HashMap<ClientToken, MutReceiver>>,
}

impl MutChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ClientToken, MutReceiver>> {
        self.receivers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ClientToken, MutReceiver>> {
        self.receivers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a clean receiver for `peer`, replacing any previous one
    pub fn new_receiver(&self, peer: &ClientToken) -> MutReceiver {
        let receiver = MutReceiver::new();
        self.write().insert(peer.clone(), receiver.clone());
        receiver
    }

    pub fn remove_receiver(&self, peer: &ClientToken) -> Option<MutReceiver> {
        self.write().remove(peer)
    }

    pub fn receiver(&self, peer: &ClientToken) -> Option<MutReceiver> {
        self.read().get(peer).cloned()
    }

    pub fn has_receivers(&self) -> bool {
        !self.read().is_empty()
    }

    pub fn send(&self, mutation: &Mutation) {
        for receiver in self.read().values() {
            receiver.mutate(mutation);
        }
    }
}

// MutReceiver
#[derive(Clone, Default)]
pub struct MutReceiver {
    mask: Arc<RwLock<DirtySet>>,
}

impl MutReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mask(&self) -> RwLockReadGuard<'_, DirtySet> {
        self.mask.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn mask_mut(&self) -> RwLockWriteGuard<'_, DirtySet> {
        self.mask.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_clear(&self) -> bool {
        self.mask().is_clear()
    }

    pub fn mutate(&self, mutation: &Mutation) {
        let mut mask = self.mask_mut();
        match mutation {
            Mutation::Key(key) => mask.mark(key.clone()),
            Mutation::Cleared => mask.mark_cleared(),
            Mutation::Touched => mask.touch(),
        }
    }

    pub fn or_mask(&self, other: &DirtySet) {
        self.mask_mut().or(other);
    }

    /// Takes the accumulated changes, leaving the receiver clean
    pub fn take(&self) -> DirtySet {
        std::mem::take(&mut *self.mask_mut())
    }

    pub fn clear_mask(&self) {
        self.mask_mut().clear();
    }
}
