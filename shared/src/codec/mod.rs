pub mod object_tracker;
pub mod value_decoder;
pub mod value_encoder;
