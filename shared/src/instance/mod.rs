pub mod dirty_set;
pub mod instance;
pub mod mut_channel;
pub mod state;
