use std::default::Default;

use crate::{MethodResultMessage, SyncError};

/// What to do with a `Create` for an id this side already holds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateCreatePolicy {
    /// Re-apply the full description to the existing instance
    #[default]
    Reinitialize,
    /// Keep the existing instance as it is
    Ignore,
}

/// Contains Config properties used when applying an incoming batch
#[derive(Clone, Debug)]
pub struct ApplyConfig {
    /// Stop at the first failing message instead of carrying on with the
    /// rest of the batch
    pub abort_on_error: bool,
    /// Handling of a `Create` for an already known object
    pub duplicate_create: DuplicateCreatePolicy,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            abort_on_error: false,
            duplicate_create: DuplicateCreatePolicy::Reinitialize,
        }
    }
}

/// Outcome of applying one batch
#[derive(Clone, Debug, Default)]
pub struct ApplyReport {
    /// Answers to awaited `Invoke`s in the batch, in message order
    pub results: Vec<MethodResultMessage>,
    /// Failed messages, by position in the batch
    pub errors: Vec<(usize, SyncError)>,
}

impl ApplyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
