pub mod key;
pub mod value;
pub mod wire_value;
