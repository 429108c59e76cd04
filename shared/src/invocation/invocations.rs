use futures::channel::oneshot;
use indexmap::IndexMap;
use log::debug;

use crate::{
    codec::value_decoder::ValueDecoder, key_generator::CorrelationIdGenerator, ClientToken,
    CorrelationId, MethodResultMessage, ObjectId, SyncError, Value,
};

use super::pending_result::PendingResult;

struct PendingCall {
    method: String,
    object_id: ObjectId,
    sender: oneshot::Sender<Result<Value, SyncError>>,
}

/// Outgoing method calls to one peer that are waiting for a `Result`
pub struct Invocations {
    peer: ClientToken,
    generator: CorrelationIdGenerator,
    pending: IndexMap<CorrelationId, PendingCall>,
}

impl Invocations {
    pub fn new(peer: ClientToken) -> Self {
        Self {
            peer,
            generator: CorrelationIdGenerator::new(),
            pending: IndexMap::new(),
        }
    }

    pub fn next_correlation_id(&mut self) -> CorrelationId {
        self.generator.generate()
    }

    /// Registers a call awaiting a reply
    pub fn begin(&mut self, object_id: &ObjectId, method: &str) -> (CorrelationId, PendingResult) {
        let correlation_id = self.generator.generate();
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(
            correlation_id.clone(),
            PendingCall {
                method: method.to_string(),
                object_id: object_id.clone(),
                sender,
            },
        );
        (correlation_id, PendingResult::new(self.peer.clone(), receiver))
    }

    /// Completes the call `result` answers
    pub fn resolve(
        &mut self,
        result: &MethodResultMessage,
        decoder: &ValueDecoder<'_>,
    ) -> Result<(), SyncError> {
        let call = self
            .pending
            .shift_remove(&result.correlation_id)
            .ok_or_else(|| {
                SyncError::protocol(format!(
                    "result for unknown correlation id {}",
                    result.correlation_id
                ))
            })?;
        let outcome = match (&result.error, &result.value) {
            (Some(message), _) => Err(SyncError::MethodInvocation {
                method: call.method.clone(),
                message: message.clone(),
            }),
            (None, Some(wire)) => decoder.deserialize(wire),
            (None, None) => Ok(Value::Null),
        };
        debug!(
            "Call {} of '{}' on {} resolved",
            result.correlation_id, call.method, call.object_id
        );
        // the caller may have stopped waiting
        let _ = call.sender.send(outcome);
        Ok(())
    }

    /// Drops every pending call; waiting callers see `PeerUnavailable`
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
