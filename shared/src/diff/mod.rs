pub mod error;
pub mod sequence_diff;
pub mod splice;

pub use error::SpliceError;
pub use sequence_diff::diff;
pub use splice::{apply, apply_in_place, validate, SpliceInstruction};
