use serde::{Deserialize, Serialize};

use super::error::SpliceError;

/// One contiguous edit region. `start` is always a position in the
/// *original* sequence, even when several instructions are applied together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpliceInstruction<T> {
    pub start: usize,
    pub delete_count: usize,
    pub items: Vec<T>,
}

impl<T> SpliceInstruction<T> {
    pub fn new(start: usize, delete_count: usize, items: Vec<T>) -> Self {
        Self {
            start,
            delete_count,
            items,
        }
    }

    pub fn insert(start: usize, items: Vec<T>) -> Self {
        Self::new(start, 0, items)
    }

    pub fn delete(start: usize, delete_count: usize) -> Self {
        Self::new(start, delete_count, Vec::new())
    }

    pub fn replace(start: usize, delete_count: usize, items: Vec<T>) -> Self {
        Self::new(start, delete_count, items)
    }

    /// First index of the original sequence past this region
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.delete_count)
    }

    pub fn is_noop(&self) -> bool {
        self.delete_count == 0 && self.items.is_empty()
    }

    /// Returns true if `index` of the original sequence is removed by this
    /// instruction
    pub fn covers(&self, index: usize) -> bool {
        index >= self.start && index < self.end()
    }

    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(T) -> Result<U, E>,
    ) -> Result<SpliceInstruction<U>, E> {
        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            items.push(f(item)?);
        }
        Ok(SpliceInstruction::new(self.start, self.delete_count, items))
    }
}

/// Checks a batch of instructions against the length of the sequence they
/// will be applied to.
pub fn validate<T>(len: usize, edits: &[SpliceInstruction<T>]) -> Result<(), SpliceError> {
    let mut previous_end = 0;
    for (index, edit) in edits.iter().enumerate() {
        if edit.start > len || edit.delete_count > len - edit.start {
            return Err(SpliceError::OutOfRange {
                start: edit.start,
                delete_count: edit.delete_count,
                len,
            });
        }
        if index > 0 && edit.start < previous_end {
            return Err(SpliceError::Overlapping {
                start: edit.start,
                previous_end,
            });
        }
        previous_end = edit.end();
    }
    Ok(())
}

/// Builds the edited sequence without touching `old`
pub fn apply<T: Clone>(old: &[T], edits: &[SpliceInstruction<T>]) -> Result<Vec<T>, SpliceError> {
    validate(old.len(), edits)?;

    let inserted: usize = edits.iter().map(|edit| edit.items.len()).sum();
    let deleted: usize = edits.iter().map(|edit| edit.delete_count).sum();
    let mut output = Vec::with_capacity(old.len() - deleted + inserted);

    let mut cursor = 0;
    for edit in edits {
        output.extend_from_slice(&old[cursor..edit.start]);
        output.extend(edit.items.iter().cloned());
        cursor = edit.end();
    }
    output.extend_from_slice(&old[cursor..]);

    Ok(output)
}

/// Applies the instructions to `target` in place, last region first, so
/// that untouched items are moved rather than cloned. Nothing is modified
/// if validation fails.
pub fn apply_in_place<T>(
    target: &mut Vec<T>,
    edits: Vec<SpliceInstruction<T>>,
) -> Result<(), SpliceError> {
    validate(target.len(), &edits)?;

    for edit in edits.into_iter().rev() {
        let end = edit.end();
        target.splice(edit.start..end, edit.items);
    }

    Ok(())
}
