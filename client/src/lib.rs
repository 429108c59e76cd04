//! # Tether Client
//! The receiving side of a tether relationship: applies the batches an
//! authoritative host sends, keeping a local replica of its object graph,
//! and exchanges method calls with the host.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use tether_shared::{
        AgentRegistry, ApplyConfig, ApplyReport, DuplicateCreatePolicy, Instance, ObjectId,
        PendingResult, SyncError, SyncMessage, TypeDescriptor, Value,
    };
}

mod client_config;
mod remote_session;

pub use client_config::ClientConfig;
pub use remote_session::RemoteSession;
