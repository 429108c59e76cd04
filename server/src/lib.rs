//! # Tether Server
//! The authoritative side of a tether relationship: tracks a live object
//! graph, keeps a record of what each registered peer has been told, and
//! produces per-peer message batches carrying only what that peer is
//! missing.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use tether_shared::{
        ApplyConfig, ApplyReport, ClientToken, DuplicateCreatePolicy, Instance, ObjectId,
        PeerDescriptor, PendingResult, SyncError, SyncMessage, Transport, TypeDescriptor, Value,
    };
}

mod host_config;
mod host_session;
mod host_tracker;
mod peer_record;
mod peer_scope;

pub use host_config::HostConfig;
pub use host_session::HostSession;
pub use peer_scope::{PeerScopeMut, PeerScopeRef};
