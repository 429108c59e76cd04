pub mod error;

use futures::future::BoxFuture;

use crate::{ClientToken, SyncMessage};

use self::error::TransportError;

/// Message channel between the host and its peers.
///
/// One call is one round: the host's batch goes out and the peer's reply
/// batch (method results, invocations) comes back.
pub trait Transport: Send + Sync {
    fn send_to_client<'a>(
        &'a self,
        peer: &'a ClientToken,
        messages: Vec<SyncMessage>,
    ) -> BoxFuture<'a, Result<Vec<SyncMessage>, TransportError>>;
}
