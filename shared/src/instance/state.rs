use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::{Key, Value};

/// Structural kind of an instance's state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Fields,
    Sequence,
    Map,
    Set,
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Fields => "fields",
            Shape::Sequence => "sequence",
            Shape::Map => "map",
            Shape::Set => "set",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstanceState {
    /// Named fields, used by generic objects and declared record types
    Fields(IndexMap<String, Value>),
    Sequence(Vec<Value>),
    Map(IndexMap<Key, Value>),
    Set(IndexSet<Value>),
}

impl InstanceState {
    pub fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Fields => InstanceState::Fields(IndexMap::new()),
            Shape::Sequence => InstanceState::Sequence(Vec::new()),
            Shape::Map => InstanceState::Map(IndexMap::new()),
            Shape::Set => InstanceState::Set(IndexSet::new()),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            InstanceState::Fields(_) => Shape::Fields,
            InstanceState::Sequence(_) => Shape::Sequence,
            InstanceState::Map(_) => Shape::Map,
            InstanceState::Set(_) => Shape::Set,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            InstanceState::Fields(fields) => fields.len(),
            InstanceState::Sequence(items) => items.len(),
            InstanceState::Map(entries) => entries.len(),
            InstanceState::Set(elements) => elements.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
