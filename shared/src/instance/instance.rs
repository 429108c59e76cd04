use std::{
    fmt,
    hash::{Hash, Hasher},
    ptr,
    sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak},
};

use crate::{
    diff::error::SpliceError, pool::graveyard::Graveyard, ClientToken, Key, ObjectId, SyncError,
    TypeDescriptor, TypeTag, Value,
};

use super::{
    dirty_set::{DirtyKey, DirtySet},
    mut_channel::{MutChannel, Mutation},
    state::{InstanceState, Shape},
};

struct InstanceCell {
    type_tag: TypeTag,
    shape: Shape,
    descriptor: Option<Arc<TypeDescriptor>>,
    object_id: OnceLock<ObjectId>,
    state: RwLock<InstanceState>,
    mutations: MutChannel,
    graveyards: Mutex<Vec<Graveyard>>,
}

impl Drop for InstanceCell {
    fn drop(&mut self) {
        let Some(object_id) = self.object_id.get() else {
            return;
        };
        let graveyards = self
            .graveyards
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for graveyard in graveyards.drain(..) {
            graveyard.bury(object_id.clone());
        }
    }
}

/// Shared handle to a live synchronized object.
///
/// Cloning the handle does not copy the object; equality and hashing are by
/// identity. Every mutating method reports the change to the per-peer
/// receivers registered with [`Instance::watch`], which is how the host
/// learns what to put in the next `Change` for each peer.
#[derive(Clone)]
pub struct Instance {
    cell: Arc<InstanceCell>,
}

/// Non-owning link to an [`Instance`]
#[derive(Clone)]
pub struct WeakInstance {
    cell: Weak<InstanceCell>,
}

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.cell.upgrade().map(|cell| Instance { cell })
    }

    pub fn is_alive(&self) -> bool {
        self.cell.strong_count() > 0
    }
}

impl Instance {
    pub fn new(type_tag: TypeTag, state: InstanceState) -> Self {
        Self::build(type_tag, None, state)
    }

    fn build(
        type_tag: TypeTag,
        descriptor: Option<Arc<TypeDescriptor>>,
        state: InstanceState,
    ) -> Self {
        Self {
            cell: Arc::new(InstanceCell {
                type_tag,
                shape: state.shape(),
                descriptor,
                object_id: OnceLock::new(),
                state: RwLock::new(state),
                mutations: MutChannel::new(),
                graveyards: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Empty instance of the given shape, used when a remote `Create` arrives
    pub fn blank(type_tag: TypeTag, shape: Shape) -> Self {
        Self::new(type_tag, InstanceState::empty(shape))
    }

    pub fn object() -> Self {
        Self::blank(TypeTag::object(), Shape::Fields)
    }

    pub fn object_from<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self::new(TypeTag::object(), InstanceState::Fields(fields))
    }

    pub fn sequence<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = items.into_iter().map(Into::into).collect();
        Self::new(TypeTag::sequence(), InstanceState::Sequence(items))
    }

    pub fn map() -> Self {
        Self::blank(TypeTag::map(), Shape::Map)
    }

    pub fn map_from<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::new(TypeTag::map(), InstanceState::Map(entries))
    }

    pub fn empty_set() -> Self {
        Self::blank(TypeTag::set(), Shape::Set)
    }

    pub fn set_from<I, V>(elements: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let elements = elements.into_iter().map(Into::into).collect();
        Self::new(TypeTag::set(), InstanceState::Set(elements))
    }

    /// Instance of a declared type, every declared property starting as null
    pub fn record(descriptor: &Arc<TypeDescriptor>) -> Self {
        let fields = descriptor
            .properties()
            .iter()
            .map(|property| (property.name().to_string(), Value::Null))
            .collect();
        Self::build(
            descriptor.type_tag().clone(),
            Some(descriptor.clone()),
            InstanceState::Fields(fields),
        )
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.cell.type_tag
    }

    pub fn shape(&self) -> Shape {
        self.cell.shape
    }

    pub fn descriptor(&self) -> Option<&Arc<TypeDescriptor>> {
        self.cell.descriptor.as_ref()
    }

    /// Id assigned when the instance was first tracked or created remotely
    pub fn object_id(&self) -> Option<&ObjectId> {
        self.cell.object_id.get()
    }

    pub(crate) fn bind_object_id(&self, object_id: &ObjectId) -> Result<(), SyncError> {
        let bound = self.cell.object_id.get_or_init(|| object_id.clone());
        if bound != object_id {
            return Err(SyncError::IdentityConflict {
                bound: bound.clone(),
                requested: object_id.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn add_graveyard(&self, graveyard: Graveyard) {
        let mut graveyards = self
            .cell
            .graveyards
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !graveyards.iter().any(|known| known.same_as(&graveyard)) {
            graveyards.push(graveyard);
        }
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance {
            cell: Arc::downgrade(&self.cell),
        }
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.cell)
    }

    fn read(&self) -> RwLockReadGuard<'_, InstanceState> {
        self.cell.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InstanceState> {
        self.cell.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, mutation: Mutation) {
        self.cell.mutations.send(&mutation);
    }

    fn shape_mismatch(&self, expected: Shape) -> SyncError {
        SyncError::ShapeMismatch {
            type_tag: self.cell.type_tag.clone(),
            expected,
            actual: self.cell.shape,
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&InstanceState) -> R) -> R {
        f(&self.read())
    }

    pub fn snapshot(&self) -> InstanceState {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Fields

    pub fn get(&self, field: &str) -> Option<Value> {
        match &*self.read() {
            InstanceState::Fields(fields) => fields.get(field).cloned(),
            _ => None,
        }
    }

    pub fn fields(&self) -> Result<Vec<(String, Value)>, SyncError> {
        match &*self.read() {
            InstanceState::Fields(fields) => Ok(fields
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()),
            _ => Err(self.shape_mismatch(Shape::Fields)),
        }
    }

    /// Sets a field, returning the previous value. Declared types only accept
    /// declared properties.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<Option<Value>, SyncError> {
        if let Some(descriptor) = &self.cell.descriptor {
            if descriptor.property(field).is_none() {
                return Err(SyncError::UndeclaredProperty {
                    type_tag: self.cell.type_tag.clone(),
                    property: field.to_string(),
                });
            }
        }
        let previous = {
            let mut state = self.write();
            let InstanceState::Fields(fields) = &mut *state else {
                return Err(self.shape_mismatch(Shape::Fields));
            };
            fields.insert(field.to_string(), value.into())
        };
        self.notify(Mutation::Key(DirtyKey::Field(field.to_string())));
        Ok(previous)
    }

    // Sequence

    pub fn items(&self) -> Result<Vec<Value>, SyncError> {
        match &*self.read() {
            InstanceState::Sequence(items) => Ok(items.clone()),
            _ => Err(self.shape_mismatch(Shape::Sequence)),
        }
    }

    pub fn item(&self, index: usize) -> Option<Value> {
        match &*self.read() {
            InstanceState::Sequence(items) => items.get(index).cloned(),
            _ => None,
        }
    }

    fn edit_items<R>(
        &self,
        f: impl FnOnce(&mut Vec<Value>) -> Result<R, SyncError>,
    ) -> Result<R, SyncError> {
        let output = {
            let mut state = self.write();
            let InstanceState::Sequence(items) = &mut *state else {
                return Err(self.shape_mismatch(Shape::Sequence));
            };
            f(items)?
        };
        self.notify(Mutation::Touched);
        Ok(output)
    }

    pub fn push(&self, value: impl Into<Value>) -> Result<(), SyncError> {
        let value = value.into();
        self.edit_items(|items| {
            items.push(value);
            Ok(())
        })
    }

    pub fn insert_at(&self, index: usize, value: impl Into<Value>) -> Result<(), SyncError> {
        let value = value.into();
        self.edit_items(|items| {
            if index > items.len() {
                return Err(SyncError::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, value);
            Ok(())
        })
    }

    pub fn remove_at(&self, index: usize) -> Result<Value, SyncError> {
        self.edit_items(|items| {
            if index >= items.len() {
                return Err(SyncError::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            Ok(items.remove(index))
        })
    }

    pub fn set_at(&self, index: usize, value: impl Into<Value>) -> Result<Value, SyncError> {
        let value = value.into();
        self.edit_items(|items| {
            let len = items.len();
            let Some(slot) = items.get_mut(index) else {
                return Err(SyncError::IndexOutOfRange { index, len });
            };
            Ok(std::mem::replace(slot, value))
        })
    }

    /// Removes `delete_count` items at `start` and inserts `items` in their
    /// place, returning the removed items
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        inserted: Vec<Value>,
    ) -> Result<Vec<Value>, SyncError> {
        self.edit_items(|items| {
            let len = items.len();
            if start > len || delete_count > len - start {
                return Err(SpliceError::OutOfRange {
                    start,
                    delete_count,
                    len,
                }
                .into());
            }
            Ok(items.splice(start..start + delete_count, inserted).collect())
        })
    }

    pub fn replace_items(&self, replacement: Vec<Value>) -> Result<(), SyncError> {
        self.edit_items(|items| {
            *items = replacement;
            Ok(())
        })
    }

    // Map

    pub fn entries(&self) -> Result<Vec<(Key, Value)>, SyncError> {
        match &*self.read() {
            InstanceState::Map(entries) => Ok(entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()),
            _ => Err(self.shape_mismatch(Shape::Map)),
        }
    }

    pub fn entry(&self, key: &Key) -> Option<Value> {
        match &*self.read() {
            InstanceState::Map(entries) => entries.get(key).cloned(),
            _ => None,
        }
    }

    pub fn insert(
        &self,
        key: impl Into<Key>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, SyncError> {
        let key = key.into();
        let previous = {
            let mut state = self.write();
            let InstanceState::Map(entries) = &mut *state else {
                return Err(self.shape_mismatch(Shape::Map));
            };
            entries.insert(key.clone(), value.into())
        };
        self.notify(Mutation::Key(DirtyKey::Entry(key)));
        Ok(previous)
    }

    pub fn remove(&self, key: &Key) -> Result<Option<Value>, SyncError> {
        let removed = {
            let mut state = self.write();
            let InstanceState::Map(entries) = &mut *state else {
                return Err(self.shape_mismatch(Shape::Map));
            };
            entries.shift_remove(key)
        };
        if removed.is_some() {
            self.notify(Mutation::Key(DirtyKey::Entry(key.clone())));
        }
        Ok(removed)
    }

    // Set

    pub fn elements(&self) -> Result<Vec<Value>, SyncError> {
        match &*self.read() {
            InstanceState::Set(elements) => Ok(elements.iter().cloned().collect()),
            _ => Err(self.shape_mismatch(Shape::Set)),
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        match &*self.read() {
            InstanceState::Set(elements) => elements.contains(value),
            InstanceState::Sequence(items) => items.contains(value),
            _ => false,
        }
    }

    /// Adds an element, returning false if it was already present
    pub fn add(&self, value: impl Into<Value>) -> Result<bool, SyncError> {
        let value = value.into();
        let added = {
            let mut state = self.write();
            let InstanceState::Set(elements) = &mut *state else {
                return Err(self.shape_mismatch(Shape::Set));
            };
            elements.insert(value.clone())
        };
        if added {
            self.notify(Mutation::Key(DirtyKey::Element(value)));
        }
        Ok(added)
    }

    pub fn delete(&self, value: &Value) -> Result<bool, SyncError> {
        let deleted = {
            let mut state = self.write();
            let InstanceState::Set(elements) = &mut *state else {
                return Err(self.shape_mismatch(Shape::Set));
            };
            elements.shift_remove(value)
        };
        if deleted {
            self.notify(Mutation::Key(DirtyKey::Element(value.clone())));
        }
        Ok(deleted)
    }

    /// Empties a sequence, map or set
    pub fn clear(&self) -> Result<(), SyncError> {
        let mutation = {
            let mut state = self.write();
            match &mut *state {
                InstanceState::Sequence(items) => {
                    items.clear();
                    Mutation::Touched
                }
                InstanceState::Map(entries) => {
                    entries.clear();
                    Mutation::Cleared
                }
                InstanceState::Set(elements) => {
                    elements.clear();
                    Mutation::Cleared
                }
                InstanceState::Fields(_) => {
                    return Err(SyncError::ShapeMismatch {
                        type_tag: self.cell.type_tag.clone(),
                        expected: Shape::Map,
                        actual: Shape::Fields,
                    })
                }
            }
        };
        self.notify(mutation);
        Ok(())
    }

    // Per-peer change tracking

    /// Starts (or restarts) recording changes for `peer` from a clean slate
    pub fn watch(&self, peer: &ClientToken) {
        self.cell.mutations.new_receiver(peer);
    }

    pub fn unwatch(&self, peer: &ClientToken) {
        self.cell.mutations.remove_receiver(peer);
    }

    pub fn is_watched_by(&self, peer: &ClientToken) -> bool {
        self.cell.mutations.receiver(peer).is_some()
    }

    pub fn is_dirty_for(&self, peer: &ClientToken) -> bool {
        self.cell
            .mutations
            .receiver(peer)
            .map(|receiver| !receiver.is_clear())
            .unwrap_or(false)
    }

    /// Takes everything changed since the last take for `peer`
    pub fn take_dirty(&self, peer: &ClientToken) -> DirtySet {
        self.cell
            .mutations
            .receiver(peer)
            .map(|receiver| receiver.take())
            .unwrap_or_default()
    }

    /// Puts back changes taken by [`Instance::take_dirty`] when they could
    /// not be sent
    pub fn restore_dirty(&self, peer: &ClientToken, dirty: &DirtySet) {
        if let Some(receiver) = self.cell.mutations.receiver(peer) {
            receiver.or_mask(dirty);
        }
    }

    // Remote application. These bypass change tracking.

    /// Replaces the whole state; the shape must not change
    pub fn replace_state(&self, state: InstanceState) -> Result<(), SyncError> {
        if state.shape() != self.cell.shape {
            return Err(self.shape_mismatch(state.shape()));
        }
        *self.write() = state;
        Ok(())
    }

    pub fn update_state<R>(&self, f: impl FnOnce(&mut InstanceState) -> R) -> R {
        f(&mut self.write())
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(Arc::as_ptr(&self.cell), state);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print state here: object graphs may be cyclic.
        f.debug_struct("Instance")
            .field("type_tag", &self.cell.type_tag)
            .field("object_id", &self.cell.object_id.get())
            .finish()
    }
}

impl fmt::Debug for WeakInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(instance) => write!(f, "WeakInstance({:?})", instance),
            None => f.write_str("WeakInstance(<dropped>)"),
        }
    }
}
