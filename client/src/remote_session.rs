use std::collections::{hash_map::Entry, HashMap, HashSet};

use futures::future::join_all;
use log::{debug, info, warn};

use tether_shared::{
    AgentRegistry, ApplyReport, CorrelationId, DuplicateCreatePolicy, Instance, InvokeMode,
    Invocations, MethodFuture, MethodResultMessage, ObjectId, ObjectLookup, ObjectPool,
    PeerDescriptor, PeerInfo, PendingResult, SyncAgent, SyncError, SyncMessage, TypeTag, Value,
    ValueDecoder, ValueEncoder, WireValue,
};

use crate::client_config::ClientConfig;

enum Registered {
    New,
    Existing,
}

/// A replica of the object graph of one host.
///
/// Objects live here from the `Create` that describes them until the host
/// sends their `Delete` or the session is disconnected.
pub struct RemoteSession {
    config: ClientConfig,
    registry: AgentRegistry,
    host: PeerInfo,
    pool: ObjectPool,
    agents: HashMap<ObjectId, Box<dyn SyncAgent>>,
    invocations: Invocations,
    outbox: Vec<SyncMessage>,
}

impl RemoteSession {
    pub fn new(config: ClientConfig, registry: AgentRegistry) -> Self {
        let host = PeerInfo::from(PeerDescriptor::new(config.host_identity.as_str()));
        let invocations = Invocations::new(host.token().clone());
        Self {
            config,
            registry,
            host,
            pool: ObjectPool::new(),
            agents: HashMap::new(),
            invocations,
            outbox: Vec::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn host(&self) -> &PeerInfo {
        &self.host
    }

    // Objects

    pub fn get(&self, object_id: &ObjectId) -> Option<Instance> {
        self.pool.get(object_id).cloned()
    }

    pub fn object_id(&self, instance: &Instance) -> Option<ObjectId> {
        self.pool.find_by_instance(instance)
    }

    pub fn find_by_type(&self, type_tag: &TypeTag) -> Vec<(ObjectId, Instance)> {
        self.pool.find_by_type(&|tag| tag == type_tag)
    }

    /// Every replicated object, in the order they were created
    pub fn objects(&self) -> Vec<(ObjectId, Instance)> {
        self.pool
            .iter()
            .map(|(object_id, instance)| (object_id.clone(), instance.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    // Rounds

    /// Applies a batch from the host, in order. Every `Create` in the batch
    /// is registered before anything is applied so that references between
    /// objects of the same batch (cycles included) resolve.
    pub async fn apply_messages(&mut self, messages: Vec<SyncMessage>) -> ApplyReport {
        let mut report = ApplyReport::new();
        let mut fresh: HashSet<ObjectId> = HashSet::new();
        let mut ignored: HashSet<usize> = HashSet::new();
        let mut rejected: HashMap<usize, SyncError> = HashMap::new();

        for (index, message) in messages.iter().enumerate() {
            let SyncMessage::Create {
                object_id,
                type_tag,
                ..
            } = message
            else {
                continue;
            };
            match self.register(object_id, type_tag) {
                Ok(Registered::New) => {
                    fresh.insert(object_id.clone());
                }
                Ok(Registered::Existing) => {
                    if self.config.apply.duplicate_create == DuplicateCreatePolicy::Ignore {
                        ignored.insert(index);
                    }
                }
                Err(error) => {
                    rejected.insert(index, error);
                }
            }
        }

        let mut results: Vec<(usize, MethodResultMessage)> = Vec::new();
        let mut awaiting: Vec<(usize, CorrelationId, String)> = Vec::new();
        let mut replies: Vec<MethodFuture> = Vec::new();
        let mut detached: Vec<MethodFuture> = Vec::new();
        let mut processed = 0;

        for (index, message) in messages.iter().enumerate() {
            processed = index + 1;
            let outcome = if let Some(error) = rejected.remove(&index) {
                Err(error)
            } else if ignored.contains(&index) {
                debug!(
                    "Ignoring Create of {}, already held",
                    message.object_id().map(|id| id.as_str()).unwrap_or("?")
                );
                Ok(())
            } else {
                match message {
                    SyncMessage::Create { object_id, .. } | SyncMessage::Change { object_id, .. } => {
                        self.apply_to_object(object_id, message)
                    }
                    SyncMessage::Delete { object_id } => self.delete(object_id),
                    SyncMessage::Invoke {
                        object_id,
                        method,
                        args,
                        correlation_id,
                    } => match self.start_call(object_id, method, args) {
                        Ok((InvokeMode::AwaitReply, future)) => {
                            awaiting.push((index, correlation_id.clone(), method.clone()));
                            replies.push(future);
                            Ok(())
                        }
                        Ok((InvokeMode::FireAndForget, future)) => {
                            detached.push(future);
                            Ok(())
                        }
                        Err((mode, error)) => {
                            if mode != Some(InvokeMode::FireAndForget) {
                                results.push((
                                    index,
                                    MethodResultMessage::failure(
                                        correlation_id.clone(),
                                        error.to_string(),
                                    ),
                                ));
                            }
                            Err(error)
                        }
                    },
                    SyncMessage::Result(result) => {
                        let decoder = ValueDecoder::new(&self.pool);
                        self.invocations.resolve(result, &decoder)
                    }
                }
            };

            if let Err(error) = outcome {
                if let SyncMessage::Create { object_id, .. } = message {
                    if fresh.remove(object_id) {
                        self.discard(object_id);
                    }
                }
                warn!("Rejected message {} from host: {}", index, error);
                report.errors.push((index, error));
                if self.config.apply.abort_on_error {
                    break;
                }
            }
        }

        // Creates the batch never reached
        for message in &messages[processed..] {
            if let SyncMessage::Create { object_id, .. } = message {
                if fresh.remove(object_id) {
                    self.discard(object_id);
                }
            }
        }

        let (outcomes, _) = futures::join!(join_all(replies), join_all(detached));
        for ((index, correlation_id, method), outcome) in awaiting.into_iter().zip(outcomes) {
            let result = match outcome {
                Ok(value) => match self.encode_result(&value) {
                    Ok(wire) => MethodResultMessage::success(correlation_id, wire),
                    Err(error) => {
                        warn!("Result of '{}' cannot be sent: {}", method, error);
                        MethodResultMessage::failure(correlation_id, error.to_string())
                    }
                },
                Err(message) => {
                    debug!("Method '{}' failed: {}", method, message);
                    MethodResultMessage::failure(correlation_id, message)
                }
            };
            results.push((index, result));
        }

        results.sort_by_key(|(index, _)| *index);
        for (_, result) in results {
            self.outbox.push(SyncMessage::Result(result.clone()));
            report.results.push(result);
        }
        report
    }

    fn register(&mut self, object_id: &ObjectId, type_tag: &TypeTag) -> Result<Registered, SyncError> {
        if let Some(existing) = self.pool.type_tag_of(object_id) {
            if &existing != type_tag {
                return Err(SyncError::TypeMismatch {
                    object_id: object_id.clone(),
                    expected: existing,
                    actual: type_tag.clone(),
                });
            }
            return Ok(Registered::Existing);
        }

        let instance = self.registry.instantiate(type_tag)?;
        self.pool.add(&instance, object_id, type_tag)?;
        Ok(Registered::New)
    }

    fn discard(&mut self, object_id: &ObjectId) {
        self.pool.remove(object_id);
        self.agents.remove(object_id);
        debug!("Discarded {}, its Create was not applied", object_id);
    }

    fn apply_to_object(
        &mut self,
        object_id: &ObjectId,
        message: &SyncMessage,
    ) -> Result<(), SyncError> {
        let instance = self
            .pool
            .get(object_id)
            .cloned()
            .ok_or_else(|| SyncError::UnknownObject {
                object_id: object_id.clone(),
            })?;
        let agent = match self.agents.entry(object_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.registry.create_agent(instance.type_tag())?),
        };
        let decoder = ValueDecoder::new(&self.pool);
        agent.apply_message(object_id, &instance, message, &decoder, &self.host)
    }

    fn delete(&mut self, object_id: &ObjectId) -> Result<(), SyncError> {
        self.agents.remove(object_id);
        match self.pool.remove(object_id) {
            Some(_) => {
                debug!("Deleted {}", object_id);
                Ok(())
            }
            None => Err(SyncError::UnknownObject {
                object_id: object_id.clone(),
            }),
        }
    }

    fn start_call(
        &mut self,
        object_id: &ObjectId,
        method: &str,
        args: &[WireValue],
    ) -> Result<(InvokeMode, MethodFuture), (Option<InvokeMode>, SyncError)> {
        let instance = self.pool.get(object_id).cloned().ok_or_else(|| {
            (
                None,
                SyncError::UnknownObject {
                    object_id: object_id.clone(),
                },
            )
        })?;
        let agent = match self.agents.entry(object_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(
                self.registry
                    .create_agent(instance.type_tag())
                    .map_err(|error| (None, error))?,
            ),
        };

        let mode = agent.invoke_mode(method);
        let decoder = ValueDecoder::new(&self.pool);
        let args = decoder
            .deserialize_all(args)
            .map_err(|error| (mode, error))?;
        let future = agent
            .invoke(&instance, method, args, &self.host)
            .map_err(|error| (mode, error))?;
        debug!("Host invoked '{}' on {}", method, object_id);
        Ok((mode.unwrap_or_default(), future))
    }

    fn encode_result(&mut self, value: &Value) -> Result<WireValue, SyncError> {
        ValueEncoder::new(&mut self.pool, None).serialize(value)
    }

    /// Invokes a declared method of a replicated object on the host. The
    /// call is sent with the next batch returned by [`get_messages`].
    /// Fire-and-forget methods return None.
    ///
    /// [`get_messages`]: RemoteSession::get_messages
    pub fn invoke(
        &mut self,
        instance: &Instance,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Option<PendingResult>, SyncError> {
        let object_id = self
            .pool
            .find_by_instance(instance)
            .ok_or_else(|| SyncError::unknown_instance(instance))?;
        let mode = instance
            .descriptor()
            .and_then(|descriptor| descriptor.method(method))
            .map(|descriptor| descriptor.invoke_mode())
            .ok_or_else(|| SyncError::UnknownMethod {
                type_tag: instance.type_tag().clone(),
                method: method.to_string(),
            })?;
        let args = ValueEncoder::new(&mut self.pool, None).serialize_all(&args)?;

        let (correlation_id, pending) = match mode {
            InvokeMode::AwaitReply => {
                let (correlation_id, pending) = self.invocations.begin(&object_id, method);
                (correlation_id, Some(pending))
            }
            InvokeMode::FireAndForget => (self.invocations.next_correlation_id(), None),
        };
        self.outbox.push(SyncMessage::Invoke {
            object_id,
            method: method.to_string(),
            args,
            correlation_id,
        });
        Ok(pending)
    }

    /// Drains queued invocations and method results for the host
    pub fn get_messages(&mut self) -> Vec<SyncMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// Drops every replicated object and queued message. Calls still
    /// waiting on the host resolve to `PeerUnavailable`.
    pub fn disconnect(&mut self) {
        let cancelled = self.invocations.cancel_all();
        let dropped = self.pool.len();
        self.pool.clear();
        self.agents.clear();
        self.outbox.clear();
        info!(
            "Disconnected from {}, dropped {} object(s) and {} pending call(s)",
            self.host.token(),
            dropped,
            cancelled
        );
    }
}
