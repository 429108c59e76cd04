pub mod method_descriptor;
pub mod property_descriptor;
pub mod type_descriptor;
