use indexmap::IndexMap;
use log::debug;

use tether_shared::{
    AgentRegistry, ClientToken, Instance, ObjectId, ObjectIdGenerator, ObjectLookup,
    ObjectTracker, PeerInfo, SyncError, WeakObjectPool,
};

/// Every object the host tracks, roots and discovered objects alike
pub struct TrackedObjects {
    pub pool: WeakObjectPool,
    pub registry: AgentRegistry,
    /// Strong handles, only filled when weak tracking is off
    retained: IndexMap<ObjectId, Instance>,
    id_generator: ObjectIdGenerator,
    weak_tracking: bool,
}

impl TrackedObjects {
    pub fn new(registry: AgentRegistry, id_prefix: &str, weak_tracking: bool) -> Self {
        Self {
            pool: WeakObjectPool::new(),
            registry,
            retained: IndexMap::new(),
            id_generator: ObjectIdGenerator::new(id_prefix),
            weak_tracking,
        }
    }

    /// Tracks `instance`, returning its id. An instance that is already
    /// tracked keeps its id; asking for a different one is an
    /// `IdentityConflict`.
    pub fn track(
        &mut self,
        instance: &Instance,
        requested: Option<&ObjectId>,
    ) -> Result<ObjectId, SyncError> {
        if let Some(existing) = self.pool.find_by_instance(instance) {
            return match requested {
                Some(requested) if requested != &existing => Err(SyncError::IdentityConflict {
                    bound: existing,
                    requested: requested.clone(),
                }),
                _ => Ok(existing),
            };
        }

        self.registry.provider(instance.type_tag())?;
        let object_id = match requested {
            Some(requested) => requested.clone(),
            None => instance
                .object_id()
                .cloned()
                .unwrap_or_else(|| self.id_generator.generate()),
        };
        self.pool.add(instance, &object_id, instance.type_tag())?;
        if !self.weak_tracking {
            self.retained.insert(object_id.clone(), instance.clone());
        }
        Ok(object_id)
    }

    /// Stops tracking `object_id`, returning the peers that knew it
    pub fn untrack(&mut self, object_id: &ObjectId) -> Option<Vec<ClientToken>> {
        self.retained.shift_remove(object_id);
        self.pool.remove(object_id)
    }

    /// Tracker used to serialize values for `peer`
    pub fn tracker<'a>(&'a mut self, peer: &'a PeerInfo) -> HostTracker<'a> {
        HostTracker {
            objects: self,
            peer,
        }
    }
}

/// Host-side [`ObjectTracker`]: objects met while serializing for `peer`
/// are tracked on the spot
pub struct HostTracker<'a> {
    objects: &'a mut TrackedObjects,
    peer: &'a PeerInfo,
}

impl<'a> ObjectTracker for HostTracker<'a> {
    fn resolve_or_track(&mut self, instance: &Instance) -> Result<ObjectId, SyncError> {
        if let Some(descriptor) = instance.descriptor() {
            if !descriptor.is_visible_to(self.peer) {
                return Err(SyncError::TypeHidden {
                    type_tag: instance.type_tag().clone(),
                    peer: self.peer.token().clone(),
                });
            }
        }
        if let Some(object_id) = self.objects.pool.find_by_instance(instance) {
            return Ok(object_id);
        }

        let object_id = self.objects.track(instance, None)?;
        debug!(
            "Tracking {} of type '{}', discovered through a reference",
            object_id,
            instance.type_tag()
        );
        Ok(object_id)
    }

    fn lookup(&self, instance: &Instance) -> Option<ObjectId> {
        self.objects.pool.find_by_instance(instance)
    }
}
