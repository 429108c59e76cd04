use std::fmt;

use serde::{Deserialize, Serialize};

pub const OBJECT_TYPE: &str = "object";
pub const SEQUENCE_TYPE: &str = "sequence";
pub const MAP_TYPE: &str = "map";
pub const SET_TYPE: &str = "set";

/// Stable, peer-visible identifier of a tracked object
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Wire tag selecting which agent handles an object. Sent as `typeId`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(String);

impl TypeTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn object() -> Self {
        Self::new(OBJECT_TYPE)
    }

    pub fn sequence() -> Self {
        Self::new(SEQUENCE_TYPE)
    }

    pub fn map() -> Self {
        Self::new(MAP_TYPE)
    }

    pub fn set() -> Self {
        Self::new(SET_TYPE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_builtin(&self) -> bool {
        matches!(
            self.0.as_str(),
            OBJECT_TYPE | SEQUENCE_TYPE | MAP_TYPE | SET_TYPE
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Pairs a method invocation with its result
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
