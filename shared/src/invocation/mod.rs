pub mod invocations;
pub mod pending_result;
