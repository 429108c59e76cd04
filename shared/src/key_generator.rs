use std::sync::atomic::{AtomicU64, Ordering};

use crate::{CorrelationId, ObjectId};

// Shared by every generator in the process so generated ids never collide,
// even across sessions.
static NEXT_OBJECT_KEY: AtomicU64 = AtomicU64::new(1);

/// Generates process-unique [`ObjectId`]s of the form `{prefix}{n}`
#[derive(Clone, Debug)]
pub struct ObjectIdGenerator {
    prefix: String,
}

impl ObjectIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn generate(&self) -> ObjectId {
        let key = NEXT_OBJECT_KEY.fetch_add(1, Ordering::Relaxed);
        ObjectId::new(format!("{}{}", self.prefix, key))
    }
}

impl Default for ObjectIdGenerator {
    fn default() -> Self {
        Self::new("o")
    }
}

/// Generates correlation ids, unique within one peer relationship
#[derive(Debug, Default)]
pub struct CorrelationIdGenerator {
    next: u64,
}

impl CorrelationIdGenerator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn generate(&mut self) -> CorrelationId {
        self.next = self.next.wrapping_add(1);
        CorrelationId::new(self.next.to_string())
    }
}
