use thiserror::Error;

/// Errors that can occur while applying splice instructions
///
/// Splices are validated as a batch before anything is applied, so hitting
/// one of these never leaves a sequence half edited.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    /// Splice reaches past the end of the sequence it is applied to
    #[error("Splice at {start} removing {delete_count} item(s) exceeds sequence length {len}")]
    OutOfRange {
        start: usize,
        delete_count: usize,
        len: usize,
    },

    /// Splices must be ordered by start and must not overlap
    #[error("Splice at {start} overlaps or precedes the previous splice ending at {previous_end}")]
    Overlapping { start: usize, previous_end: usize },
}
