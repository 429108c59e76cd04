use std::{collections::BTreeSet, fmt, sync::Arc};

/// Identity of one remote peer. Equality is by identity value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ClientToken {
    identity: Arc<str>,
}

impl ClientToken {
    pub fn new(identity: impl AsRef<str>) -> Self {
        Self {
            identity: Arc::from(identity.as_ref()),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

/// What a host learns about a peer when it connects
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerDescriptor {
    pub identity: String,
    pub designations: BTreeSet<String>,
}

impl PeerDescriptor {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            designations: BTreeSet::new(),
        }
    }

    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designations.insert(designation.into());
        self
    }
}

/// A registered peer: its token plus the designations used for visibility
/// filtering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerInfo {
    token: ClientToken,
    designations: BTreeSet<String>,
}

impl PeerInfo {
    pub fn new(token: ClientToken, designations: BTreeSet<String>) -> Self {
        Self {
            token,
            designations,
        }
    }

    pub fn token(&self) -> &ClientToken {
        &self.token
    }

    pub fn designations(&self) -> &BTreeSet<String> {
        &self.designations
    }

    pub fn has_designation(&self, designation: &str) -> bool {
        self.designations.contains(designation)
    }
}

impl From<PeerDescriptor> for PeerInfo {
    fn from(descriptor: PeerDescriptor) -> Self {
        Self::new(ClientToken::new(&descriptor.identity), descriptor.designations)
    }
}

/// Restricts a type, property or method to a subset of peers
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    All,
    /// Visible to peers carrying at least one of these designations
    Designated(BTreeSet<String>),
}

impl Visibility {
    pub fn designated<I, S>(designations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Visibility::Designated(designations.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, peer: &PeerInfo) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Designated(designations) => designations
                .iter()
                .any(|designation| peer.has_designation(designation)),
        }
    }
}
