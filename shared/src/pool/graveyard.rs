use std::sync::{Arc, Mutex, PoisonError};

use crate::ObjectId;

/// Queue of ids whose instances were dropped, filled from whichever thread
/// drops the last handle and drained by the owning pool
#[derive(Clone, Default)]
pub struct Graveyard {
    buried: Arc<Mutex<Vec<ObjectId>>>,
}

impl Graveyard {
    pub fn bury(&self, object_id: ObjectId) {
        self.buried
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(object_id);
    }

    pub fn drain(&self) -> Vec<ObjectId> {
        std::mem::take(&mut *self.buried.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns true if both handles fill the same queue
    pub fn same_as(&self, other: &Graveyard) -> bool {
        Arc::ptr_eq(&self.buried, &other.buried)
    }

    pub fn is_empty(&self) -> bool {
        self.buried
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
