pub mod payload;
pub mod sync_message;
