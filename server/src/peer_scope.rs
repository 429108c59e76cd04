use tether_shared::{ClientToken, Instance};

use crate::host_session::HostSession;

pub struct PeerScopeRef<'s> {
    session: &'s HostSession,
    peer: ClientToken,
}

impl<'s> PeerScopeRef<'s> {
    pub(crate) fn new(session: &'s HostSession, peer: &ClientToken) -> Self {
        Self {
            session,
            peer: peer.clone(),
        }
    }

    /// Returns true if the Peer's scope contains the root
    pub fn has(&self, instance: &Instance) -> bool {
        self.session.peer_scope_has(&self.peer, instance)
    }
}

pub struct PeerScopeMut<'s> {
    session: &'s mut HostSession,
    peer: ClientToken,
}

impl<'s> PeerScopeMut<'s> {
    pub(crate) fn new(session: &'s mut HostSession, peer: &ClientToken) -> Self {
        Self {
            session,
            peer: peer.clone(),
        }
    }

    /// Returns true if the Peer's scope contains the root
    pub fn has(&self, instance: &Instance) -> bool {
        self.session.peer_scope_has(&self.peer, instance)
    }

    /// Adds a root to the Peer's scope
    pub fn include(&mut self, instance: &Instance) -> &mut Self {
        self.session.peer_scope_set(&self.peer, instance, true);

        self
    }

    /// Removes a root from the Peer's scope. The peer is sent a `Delete` if
    /// it holds the object.
    pub fn exclude(&mut self, instance: &Instance) -> &mut Self {
        self.session.peer_scope_set(&self.peer, instance, false);

        self
    }

    /// Removes all roots from the Peer's scope
    pub fn clear(&mut self) -> &mut Self {
        self.session.peer_scope_clear(&self.peer);

        self
    }
}
