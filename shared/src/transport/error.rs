use thiserror::Error;

use crate::ClientToken;

/// Errors that can occur while exchanging a batch with a peer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer is not reachable over this transport
    #[error("Peer {peer} is not connected to this transport")]
    NotConnected { peer: ClientToken },

    /// The transport was closed before the exchange completed
    #[error("Transport closed before the batch for {peer} was answered")]
    Closed { peer: ClientToken },

    /// A batch could not be encoded or decoded for the wire
    #[error("Batch could not be carried over the wire: {reason}")]
    Encoding { reason: String },
}
