use crate::{Instance, ObjectId, TypeTag};

/// Read access to a pool of tracked objects. Iteration follows the order
/// objects were added.
pub trait ObjectLookup {
    fn find_by_id(&self, object_id: &ObjectId) -> Option<Instance>;

    fn find_by_instance(&self, instance: &Instance) -> Option<ObjectId>;

    fn find_by_type(&self, predicate: &dyn Fn(&TypeTag) -> bool) -> Vec<(ObjectId, Instance)>;

    fn contains(&self, object_id: &ObjectId) -> bool;

    fn type_tag_of(&self, object_id: &ObjectId) -> Option<TypeTag>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ids(&self) -> Vec<ObjectId>;
}
