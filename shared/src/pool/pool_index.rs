use indexmap::IndexMap;

use crate::{Instance, ObjectId, SyncError, TypeTag, WeakInstance};

/// How a pool holds on to its instances
pub trait PoolHandle: Clone {
    fn from_instance(instance: &Instance) -> Self;
    fn upgrade(&self) -> Option<Instance>;
}

impl PoolHandle for Instance {
    fn from_instance(instance: &Instance) -> Self {
        instance.clone()
    }

    fn upgrade(&self) -> Option<Instance> {
        Some(self.clone())
    }
}

impl PoolHandle for WeakInstance {
    fn from_instance(instance: &Instance) -> Self {
        instance.downgrade()
    }

    fn upgrade(&self) -> Option<Instance> {
        WeakInstance::upgrade(self)
    }
}

#[derive(Clone)]
pub struct PoolEntry<H: PoolHandle> {
    pub handle: H,
    pub type_tag: TypeTag,
}

/// Whether [`PoolIndex::insert`] added a new entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inserted {
    New,
    AlreadyPresent,
}

/// Insertion-ordered id → instance index shared by both pool kinds
pub struct PoolIndex<H: PoolHandle> {
    entries: IndexMap<ObjectId, PoolEntry<H>>,
}

impl<H: PoolHandle> Default for PoolIndex<H> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<H: PoolHandle> PoolIndex<H> {
    pub fn insert(
        &mut self,
        instance: &Instance,
        object_id: &ObjectId,
        type_tag: &TypeTag,
    ) -> Result<Inserted, SyncError> {
        if instance.type_tag() != type_tag {
            return Err(SyncError::TypeMismatch {
                object_id: object_id.clone(),
                expected: type_tag.clone(),
                actual: instance.type_tag().clone(),
            });
        }
        if let Some(entry) = self.entries.get(object_id) {
            match entry.handle.upgrade() {
                Some(existing) if existing.ptr_eq(instance) => return Ok(Inserted::AlreadyPresent),
                Some(_) => {
                    return Err(SyncError::DuplicateObjectId {
                        object_id: object_id.clone(),
                    })
                }
                // a dead weak entry that has not been collected yet
                None => {}
            }
        }
        instance.bind_object_id(object_id)?;
        self.entries.insert(
            object_id.clone(),
            PoolEntry {
                handle: H::from_instance(instance),
                type_tag: type_tag.clone(),
            },
        );
        Ok(Inserted::New)
    }

    pub fn get(&self, object_id: &ObjectId) -> Option<&PoolEntry<H>> {
        self.entries.get(object_id)
    }

    pub fn remove(&mut self, object_id: &ObjectId) -> Option<PoolEntry<H>> {
        self.entries.shift_remove(object_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &PoolEntry<H>)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn find_by_id(&self, object_id: &ObjectId) -> Option<Instance> {
        self.entries.get(object_id)?.handle.upgrade()
    }

    pub fn find_by_instance(&self, instance: &Instance) -> Option<ObjectId> {
        let object_id = instance.object_id()?;
        let found = self.find_by_id(object_id)?;
        if found.ptr_eq(instance) {
            Some(object_id.clone())
        } else {
            None
        }
    }

    pub fn find_by_type(&self, predicate: &dyn Fn(&TypeTag) -> bool) -> Vec<(ObjectId, Instance)> {
        self.entries
            .iter()
            .filter(|(_, entry)| predicate(&entry.type_tag))
            .filter_map(|(object_id, entry)| {
                entry
                    .handle
                    .upgrade()
                    .map(|instance| (object_id.clone(), instance))
            })
            .collect()
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.entries.contains_key(object_id)
    }

    pub fn type_tag_of(&self, object_id: &ObjectId) -> Option<TypeTag> {
        self.entries
            .get(object_id)
            .map(|entry| entry.type_tag.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.entries.keys().cloned().collect()
    }
}
