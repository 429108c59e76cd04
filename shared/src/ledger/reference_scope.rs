use std::fmt;

use crate::{Key, ObjectId};

/// Position inside an owner that holds a reference
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Name(String),
    Index(usize),
    Entry(Key),
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Name(name) => write!(f, ".{}", name),
            FieldKey::Index(index) => write!(f, "[{}]", index),
            FieldKey::Entry(key) => write!(f, "[{}]", key),
        }
    }
}

/// Where a reference was serialized: an owner object, optionally narrowed to
/// one of its fields. A scope without a field covers every field of the owner.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceScope {
    pub owner: ObjectId,
    pub field: Option<FieldKey>,
}

impl ReferenceScope {
    pub fn owner(owner: ObjectId) -> Self {
        Self { owner, field: None }
    }

    pub fn field(owner: ObjectId, field: FieldKey) -> Self {
        Self {
            owner,
            field: Some(field),
        }
    }

    /// Returns true if a reference recorded under `other` falls inside this
    /// scope
    pub fn covers(&self, other: &ReferenceScope) -> bool {
        self.owner == other.owner && (self.field.is_none() || self.field == other.field)
    }
}

impl fmt::Display for ReferenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}{}", self.owner, field),
            None => write!(f, "{}", self.owner),
        }
    }
}
