use std::default::Default;

use tether_shared::ApplyConfig;

/// Contains Config properties which will be used by a RemoteSession
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Used when applying batches received from the host
    pub apply: ApplyConfig,
    /// Identity the host is known by. Visibility filters and method
    /// handlers see the host as a peer with this identity.
    pub host_identity: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            apply: ApplyConfig::default(),
            host_identity: "host".to_string(),
        }
    }
}
