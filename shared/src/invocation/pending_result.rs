use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::channel::oneshot;

use crate::{ClientToken, SyncError, Value};

/// Resolves to the outcome of a remote method call.
///
/// If the peer goes away first the result is
/// [`SyncError::PeerUnavailable`].
pub struct PendingResult {
    peer: ClientToken,
    receiver: oneshot::Receiver<Result<Value, SyncError>>,
}

impl PendingResult {
    pub(crate) fn new(
        peer: ClientToken,
        receiver: oneshot::Receiver<Result<Value, SyncError>>,
    ) -> Self {
        Self { peer, receiver }
    }

    pub fn peer(&self) -> &ClientToken {
        &self.peer
    }

    /// Returns the outcome if it has already arrived, without waiting
    pub fn try_take(&mut self) -> Option<Result<Value, SyncError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Some(Err(SyncError::PeerUnavailable {
                peer: self.peer.clone(),
            })),
        }
    }
}

impl Future for PendingResult {
    type Output = Result<Value, SyncError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(SyncError::PeerUnavailable {
                peer: self.peer.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
