use crate::{
    pool::{object_lookup::ObjectLookup, object_pool::ObjectPool},
    Instance, ObjectId, SyncError,
};

/// Maps instances met during serialization to object ids
pub trait ObjectTracker {
    /// Returns the id of `instance`, tracking it first if this side is
    /// allowed to
    fn resolve_or_track(&mut self, instance: &Instance) -> Result<ObjectId, SyncError>;

    /// Returns the id of `instance` if it is already tracked
    fn lookup(&self, instance: &Instance) -> Option<ObjectId>;
}

// The receiving side never introduces objects: everything it can reference
// was created by the host.
impl ObjectTracker for ObjectPool {
    fn resolve_or_track(&mut self, instance: &Instance) -> Result<ObjectId, SyncError> {
        self.find_by_instance(instance)
            .ok_or_else(|| SyncError::unknown_instance(instance))
    }

    fn lookup(&self, instance: &Instance) -> Option<ObjectId> {
        self.find_by_instance(instance)
    }
}
