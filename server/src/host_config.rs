use std::default::Default;

use tether_shared::ApplyConfig;

/// Contains Config properties which will be used by the HostSession
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Track objects through weak links, so that dropping the last handle of
    /// an object deletes it on every peer. When false the session keeps
    /// every tracked object alive until it is untracked.
    pub weak_tracking: bool,
    /// Put every root in the scope of every peer. When false roots must be
    /// included per peer through `peer_scope_mut`.
    pub auto_scope_roots: bool,
    /// Prefix of generated object ids
    pub id_prefix: String,
    /// Used when applying batches received from peers
    pub apply: ApplyConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            weak_tracking: true,
            auto_scope_roots: true,
            id_prefix: "h".to_string(),
            apply: ApplyConfig::default(),
        }
    }
}
