use crate::{Instance, ObjectId, SyncError, TypeTag};

use super::{
    object_lookup::ObjectLookup,
    pool_index::{Inserted, PoolIndex},
};

/// Pool holding strong handles: everything in it stays alive until removed
#[derive(Default)]
pub struct ObjectPool {
    index: PoolIndex<Instance>,
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance under `object_id`. Re-adding the same instance is a
    /// no-op; the id may not be held by a different instance.
    pub fn add(
        &mut self,
        instance: &Instance,
        object_id: &ObjectId,
        type_tag: &TypeTag,
    ) -> Result<bool, SyncError> {
        let inserted = self.index.insert(instance, object_id, type_tag)?;
        Ok(inserted == Inserted::New)
    }

    pub fn get(&self, object_id: &ObjectId) -> Option<&Instance> {
        self.index.get(object_id).map(|entry| &entry.handle)
    }

    pub fn remove(&mut self, object_id: &ObjectId) -> Option<Instance> {
        self.index.remove(object_id).map(|entry| entry.handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &Instance)> {
        self.index
            .iter()
            .map(|(object_id, entry)| (object_id, &entry.handle))
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }
}

impl ObjectLookup for ObjectPool {
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
