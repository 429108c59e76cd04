use indexmap::IndexSet;

use crate::{Key, Value};

/// What was touched by a single mutation
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DirtyKey {
    Field(String),
    Entry(Key),
    Element(Value),
}

/// Per-peer record of what changed on an instance since the last send.
///
/// `cleared` means the whole collection was emptied; keys recorded after the
/// clear describe what was added back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirtySet {
    keys: IndexSet<DirtyKey>,
    cleared: bool,
    touched: bool,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_clear(&self) -> bool {
        !self.touched
    }

    pub fn was_cleared(&self) -> bool {
        self.cleared
    }

    pub fn mark(&mut self, key: DirtyKey) {
        self.keys.insert(key);
        self.touched = true;
    }

    pub fn mark_cleared(&mut self) {
        self.keys.clear();
        self.cleared = true;
        self.touched = true;
    }

    /// Marks the instance as changed without naming a key, used by sequences
    /// which are diffed as a whole
    pub fn touch(&mut self) {
        self.touched = true;
    }

    pub fn or(&mut self, other: &DirtySet) {
        if other.cleared {
            self.cleared = true;
        }
        for key in other.keys.iter() {
            self.keys.insert(key.clone());
        }
        self.touched |= other.touched;
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.cleared = false;
        self.touched = false;
    }

    pub fn keys(&self) -> impl Iterator<Item = &DirtyKey> {
        self.keys.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().filter_map(|key| match key {
            DirtyKey::Field(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter_map(|key| match key {
            DirtyKey::Entry(key) => Some(key),
            _ => None,
        })
    }

    pub fn elements(&self) -> impl Iterator<Item = &Value> {
        self.keys.iter().filter_map(|key| match key {
            DirtyKey::Element(value) => Some(value),
            _ => None,
        })
    }
}
