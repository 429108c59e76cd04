use std::collections::{hash_map::Entry, HashMap, HashSet, VecDeque};

use futures::future::join_all;
use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};

use tether_shared::{
    AgentRegistry, ApplyReport, ClientToken, CorrelationId, Instance, InvokeMode, MethodFuture,
    MethodResultMessage, ObjectId, ObjectLookup, PeerDescriptor, PeerInfo, PendingResult,
    ReferenceLedger, ReferenceScope, SyncAgent, SyncError, SyncMessage, Transport, Value,
    ValueDecoder, ValueEncoder, WireValue,
};

use crate::{
    host_config::HostConfig,
    host_tracker::TrackedObjects,
    peer_record::PeerRecord,
    peer_scope::{PeerScopeMut, PeerScopeRef},
};

/// The authoritative side of a replication relationship.
///
/// Tracks root objects (and everything reachable from them), keeps one
/// [`PeerRecord`] per registered peer and produces, per peer, the minimal
/// batch of messages that brings that peer up to date.
pub struct HostSession {
    config: HostConfig,
    objects: TrackedObjects,
    agents: HashMap<ObjectId, Box<dyn SyncAgent>>,
    roots: IndexSet<ObjectId>,
    peers: IndexMap<ClientToken, PeerRecord>,
}

impl HostSession {
    /// Create a new HostSession with the built-in types registered
    pub fn new(config: HostConfig) -> Self {
        Self::with_registry(config, AgentRegistry::new())
    }

    pub fn with_registry(config: HostConfig, registry: AgentRegistry) -> Self {
        let objects = TrackedObjects::new(registry, &config.id_prefix, config.weak_tracking);
        Self {
            config,
            objects,
            agents: HashMap::new(),
            roots: IndexSet::new(),
            peers: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.objects.registry
    }

    // Objects

    /// Tracks `instance` as a root, returning its object id
    pub fn track(&mut self, instance: &Instance) -> Result<ObjectId, SyncError> {
        self.track_root(instance, None)
    }

    /// Tracks `instance` as a root under an explicit object id
    pub fn track_with_id(
        &mut self,
        instance: &Instance,
        object_id: impl Into<ObjectId>,
    ) -> Result<ObjectId, SyncError> {
        let object_id = object_id.into();
        self.track_root(instance, Some(&object_id))
    }

    fn track_root(
        &mut self,
        instance: &Instance,
        requested: Option<&ObjectId>,
    ) -> Result<ObjectId, SyncError> {
        let object_id = self.objects.track(instance, requested)?;
        if self.roots.insert(object_id.clone()) {
            info!(
                "Tracking root {} of type '{}'",
                object_id,
                instance.type_tag()
            );
            if self.config.auto_scope_roots {
                for record in self.peers.values_mut() {
                    record.scope.insert(object_id.clone());
                }
            }
        }
        Ok(object_id)
    }

    /// Stops tracking `instance`. Every peer that holds it is sent a
    /// `Delete` on its next round.
    pub fn untrack(&mut self, instance: &Instance) -> Result<ObjectId, SyncError> {
        let object_id = self
            .objects
            .pool
            .find_by_instance(instance)
            .ok_or_else(|| SyncError::unknown_instance(instance))?;

        self.objects.untrack(&object_id);
        self.agents.remove(&object_id);
        self.roots.shift_remove(&object_id);
        for (token, record) in self.peers.iter_mut() {
            record.scope.shift_remove(&object_id);
            record.queue_delete(&object_id);
            instance.unwatch(token);
        }

        info!("Untracked {}", object_id);
        Ok(object_id)
    }

    pub fn object_id(&self, instance: &Instance) -> Option<ObjectId> {
        self.objects.pool.find_by_instance(instance)
    }

    pub fn get(&self, object_id: &ObjectId) -> Option<Instance> {
        self.objects.pool.find_by_id(object_id)
    }

    pub fn is_tracked(&self, instance: &Instance) -> bool {
        self.object_id(instance).is_some()
    }

    pub fn is_root(&self, object_id: &ObjectId) -> bool {
        self.roots.contains(object_id)
    }

    pub fn roots(&self) -> impl Iterator<Item = &ObjectId> {
        self.roots.iter()
    }

    /// Number of live tracked objects, roots included
    pub fn tracked_count(&self) -> usize {
        self.objects.pool.len()
    }

    // Peers

    /// Registers a peer and returns its token. Registering an identity
    /// again starts that peer over from nothing.
    pub fn register_peer(&mut self, descriptor: PeerDescriptor) -> ClientToken {
        let info = PeerInfo::from(descriptor);
        let token = info.token().clone();
        if self.peers.contains_key(&token) {
            warn!("Peer {} registered again, resetting its state", token);
            let _ = self.remove_peer(&token);
        }

        let mut record = PeerRecord::new(info);
        if self.config.auto_scope_roots {
            record.scope.extend(self.roots.iter().cloned());
        }
        self.peers.insert(token.clone(), record);

        info!("Peer {} registered", token);
        token
    }

    /// Drops everything known about a peer. Calls still waiting on it
    /// resolve to `PeerUnavailable`.
    pub fn remove_peer(&mut self, peer: &ClientToken) -> Result<(), SyncError> {
        let mut record = self.take_record(peer)?;

        for object_id in record.ledger.known_ids() {
            if let Some(instance) = self.objects.pool.find_by_id(&object_id) {
                instance.unwatch(peer);
            }
        }
        self.objects.pool.forget_peer(peer);
        for agent in self.agents.values_mut() {
            agent.forget_peer(peer);
        }
        let cancelled = record.invocations.cancel_all();

        info!(
            "Peer {} removed, {} pending call(s) cancelled",
            peer, cancelled
        );
        Ok(())
    }

    fn take_record(&mut self, peer: &ClientToken) -> Result<PeerRecord, SyncError> {
        self.peers
            .shift_remove(peer)
            .ok_or_else(|| SyncError::UnknownPeer { peer: peer.clone() })
    }

    pub fn has_peer(&self, peer: &ClientToken) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = &ClientToken> {
        self.peers.keys()
    }

    pub fn peer_info(&self, peer: &ClientToken) -> Option<&PeerInfo> {
        self.peers.get(peer).map(|record| &record.info)
    }

    /// What `peer` has been told about, for inspection
    pub fn ledger(&self, peer: &ClientToken) -> Option<&ReferenceLedger> {
        self.peers.get(peer).map(|record| &record.ledger)
    }

    pub fn is_known_by(&self, object_id: &ObjectId, peer: &ClientToken) -> bool {
        self.peers
            .get(peer)
            .map(|record| record.ledger.is_known(object_id))
            .unwrap_or(false)
    }

    /// Marks references recorded under `scope` (or every reference, when
    /// `scope` is None) as needing a full description again. Returns how
    /// many objects were affected.
    pub fn clear_stored_references(
        &mut self,
        peer: &ClientToken,
        scope: Option<&ReferenceScope>,
    ) -> Result<usize, SyncError> {
        let record = self.record_mut(peer)?;
        let cleared = record.ledger.clear_stored_references(scope);
        debug!("Cleared {} stored reference(s) for peer {}", cleared, peer);
        Ok(cleared)
    }

    fn record_mut(&mut self, peer: &ClientToken) -> Result<&mut PeerRecord, SyncError> {
        self.peers
            .get_mut(peer)
            .ok_or_else(|| SyncError::UnknownPeer { peer: peer.clone() })
    }

    // Scopes

    /// Retrieve a PeerScopeRef for a given peer
    pub fn peer_scope(&self, peer: &ClientToken) -> Result<PeerScopeRef<'_>, SyncError> {
        if !self.peers.contains_key(peer) {
            return Err(SyncError::UnknownPeer { peer: peer.clone() });
        }
        Ok(PeerScopeRef::new(self, peer))
    }

    /// Retrieve a PeerScopeMut for a given peer
    pub fn peer_scope_mut(&mut self, peer: &ClientToken) -> Result<PeerScopeMut<'_>, SyncError> {
        if !self.peers.contains_key(peer) {
            return Err(SyncError::UnknownPeer { peer: peer.clone() });
        }
        Ok(PeerScopeMut::new(self, peer))
    }

    pub(crate) fn peer_scope_has(&self, peer: &ClientToken, instance: &Instance) -> bool {
        match (self.peers.get(peer), self.object_id(instance)) {
            (Some(record), Some(object_id)) => record.scope.contains(&object_id),
            _ => false,
        }
    }

    pub(crate) fn peer_scope_set(&mut self, peer: &ClientToken, instance: &Instance, included: bool) {
        let Some(object_id) = self.object_id(instance) else {
            warn!(
                "Cannot change the scope of peer {}: instance of type '{}' is not tracked",
                peer,
                instance.type_tag()
            );
            return;
        };
        let Some(record) = self.peers.get_mut(peer) else {
            return;
        };

        if included {
            record.scope.insert(object_id);
        } else if record.scope.shift_remove(&object_id) {
            self.exclude(peer, &object_id, instance);
        }
    }

    pub(crate) fn peer_scope_clear(&mut self, peer: &ClientToken) {
        let Some(record) = self.peers.get_mut(peer) else {
            return;
        };
        let excluded: Vec<ObjectId> = record.scope.drain(..).collect();
        for object_id in excluded {
            if let Some(instance) = self.objects.pool.find_by_id(&object_id) {
                self.exclude(peer, &object_id, &instance);
            }
        }
    }

    fn exclude(&mut self, peer: &ClientToken, object_id: &ObjectId, instance: &Instance) {
        if let Some(record) = self.peers.get_mut(peer) {
            record.queue_delete(object_id);
        }
        self.objects.pool.mark_unknown(object_id, peer);
        instance.unwatch(peer);
        if let Some(agent) = self.agents.get_mut(object_id) {
            agent.forget_peer(peer);
        }
    }

    // Rounds

    /// Produces the batch that brings `peer` up to date: `Delete`s first,
    /// then `Create`/`Change` messages for everything in scope and
    /// everything it references, then queued invocations and results.
    pub fn get_messages(&mut self, peer: &ClientToken) -> Result<Vec<SyncMessage>, SyncError> {
        if !self.peers.contains_key(peer) {
            return Err(SyncError::UnknownPeer { peer: peer.clone() });
        }
        self.collect_finalized();

        let Self {
            objects,
            agents,
            peers,
            ..
        } = self;
        let record = peers
            .get_mut(peer)
            .ok_or_else(|| SyncError::UnknownPeer { peer: peer.clone() })?;

        let deletes = std::mem::take(&mut record.pending_deletes);
        let mut messages: Vec<SyncMessage> = Vec::new();

        // holds objects introduced between rounds until their Create is out
        let held = std::mem::take(&mut record.pending_introduced);
        let mut introduced: HashSet<ObjectId> = held.iter().map(|(id, _)| id.clone()).collect();

        let tracked = objects.pool.ids();
        let mut queue: VecDeque<ObjectId> = tracked
            .iter()
            .filter(|id| record.scope.contains(*id))
            .cloned()
            .collect();
        queue.extend(
            tracked
                .into_iter()
                .filter(|id| record.ledger.is_known(id)),
        );
        queue.extend(held.iter().map(|(id, _)| id.clone()));

        let mut visited = HashSet::new();
        while let Some(object_id) = queue.pop_front() {
            if !visited.insert(object_id.clone()) {
                continue;
            }
            let Some(instance) = objects.pool.find_by_id(&object_id) else {
                continue;
            };
            let mut agent = match agents.remove(&object_id) {
                Some(agent) => agent,
                None => match objects.registry.create_agent(instance.type_tag()) {
                    Ok(agent) => agent,
                    Err(error) => {
                        warn!("Cannot synchronize {}: {}", object_id, error);
                        continue;
                    }
                },
            };
            if agent.type_tag(&record.info).is_none() {
                agents.insert(object_id, agent);
                continue;
            }

            let was_introduced = introduced.contains(&object_id);
            let is_new = was_introduced || !record.ledger.is_described(&object_id);
            let previous = if was_introduced {
                None
            } else {
                record.ledger.state(&object_id)
            };
            if is_new {
                record.ledger.mark_described(&object_id);
                instance.watch(peer);
            }

            let outcome = {
                let info = &record.info;
                let ledger = &mut record.ledger;
                let mut tracker = objects.tracker(info);
                let mut encoder = ValueEncoder::new(&mut tracker, Some(ledger));
                match agent.generate_messages(&object_id, &instance, &mut encoder, info, is_new) {
                    Ok(generated) => Ok((generated, encoder.take_introduced())),
                    Err(error) => {
                        encoder.revert_introduced();
                        Err(error)
                    }
                }
            };
            agents.insert(object_id.clone(), agent);

            match outcome {
                Ok((generated, newly_introduced)) => {
                    if is_new {
                        objects.pool.mark_known(&object_id, peer);
                    }
                    messages.extend(generated);
                    for (id, _) in newly_introduced {
                        introduced.insert(id.clone());
                        queue.push_back(id);
                    }
                }
                Err(error) => {
                    warn!(
                        "Skipping {} for peer {} this round: {}",
                        object_id, peer, error
                    );
                    if is_new {
                        record.ledger.restore(&object_id, previous);
                        if previous.is_none() {
                            instance.unwatch(peer);
                        }
                    }
                }
            }
        }
        drop(held);

        // an object described again this round is replaced in place by its
        // Create, so its Delete must not reach the peer
        let mut batch: Vec<SyncMessage> = {
            let created: HashSet<&ObjectId> = messages
                .iter()
                .filter_map(|message| match message {
                    SyncMessage::Create { object_id, .. } => Some(object_id),
                    _ => None,
                })
                .collect();
            deletes
                .into_iter()
                .filter(|object_id| {
                    let recreated = created.contains(object_id);
                    if recreated {
                        debug!(
                            "Dropping delete of {} for peer {}, described again",
                            object_id, peer
                        );
                    }
                    !recreated
                })
                .map(|object_id| SyncMessage::Delete { object_id })
                .collect()
        };
        batch.append(&mut messages);
        batch.append(&mut record.outbox);
        debug!("Generated {} message(s) for peer {}", batch.len(), peer);
        Ok(batch)
    }

    fn collect_finalized(&mut self) {
        for finalized in self.objects.pool.collect_finalized() {
            self.agents.remove(&finalized.object_id);
            self.roots.shift_remove(&finalized.object_id);
            for record in self.peers.values_mut() {
                record.scope.shift_remove(&finalized.object_id);
            }
            for peer in finalized.known_by.iter() {
                if let Some(record) = self.peers.get_mut(peer) {
                    record.queue_delete(&finalized.object_id);
                }
            }
        }
    }

    /// Applies a batch received from `peer`. Peers may only invoke methods
    /// and answer calls; invocation results are queued for the next round.
    pub async fn apply_messages(
        &mut self,
        peer: &ClientToken,
        messages: Vec<SyncMessage>,
    ) -> Result<ApplyReport, SyncError> {
        if !self.peers.contains_key(peer) {
            return Err(SyncError::UnknownPeer { peer: peer.clone() });
        }

        let mut report = ApplyReport::new();
        let mut results: Vec<(usize, MethodResultMessage)> = Vec::new();
        let mut awaiting: Vec<(usize, CorrelationId, String)> = Vec::new();
        let mut replies: Vec<MethodFuture> = Vec::new();
        let mut detached: Vec<MethodFuture> = Vec::new();

        for (index, message) in messages.into_iter().enumerate() {
            let outcome = match &message {
                SyncMessage::Invoke {
                    object_id,
                    method,
                    args,
                    correlation_id,
                } => match self.start_call(peer, object_id, method, args) {
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
                SyncMessage::Result(result) => self.resolve_result(peer, result),
                other => Err(SyncError::protocol(format!(
                    "peer {} sent a {} message, only the host describes objects",
                    peer,
                    other.kind_name()
                ))),
            };

            if let Err(error) = outcome {
                warn!("Rejected message {} from peer {}: {}", index, peer, error);
                report.errors.push((index, error));
                if self.config.apply.abort_on_error {
                    break;
                }
            }
        }

        let (outcomes, _) = futures::join!(join_all(replies), join_all(detached));

        let Self { objects, peers, .. } = self;
        let record = peers
            .get_mut(peer)
            .ok_or_else(|| SyncError::UnknownPeer { peer: peer.clone() })?;
        for ((index, correlation_id, method), outcome) in awaiting.into_iter().zip(outcomes) {
            let result = match outcome {
                Ok(value) => {
                    let info = &record.info;
                    let ledger = &mut record.ledger;
                    let mut tracker = objects.tracker(info);
                    let mut encoder = ValueEncoder::new(&mut tracker, Some(ledger));
                    match encoder.serialize(&value) {
                        Ok(wire) => {
                            record.pending_introduced.extend(encoder.take_introduced());
                            MethodResultMessage::success(correlation_id, wire)
                        }
                        Err(error) => {
                            encoder.revert_introduced();
                            warn!("Result of '{}' cannot be sent: {}", method, error);
                            MethodResultMessage::failure(correlation_id, error.to_string())
                        }
                    }
                }
                Err(message) => {
                    debug!("Method '{}' failed: {}", method, message);
                    MethodResultMessage::failure(correlation_id, message)
                }
            };
            results.push((index, result));
        }

        results.sort_by_key(|(index, _)| *index);
        for (_, result) in results {
            record.outbox.push(SyncMessage::Result(result.clone()));
            report.results.push(result);
        }
        Ok(report)
    }

    /// Starts a call requested by `peer`. On failure the error comes with
    /// the method's mode, when known, so the caller can tell whether an
    /// answer is expected.
    fn start_call(
        &mut self,
        peer: &ClientToken,
        object_id: &ObjectId,
        method: &str,
        args: &[WireValue],
    ) -> Result<(InvokeMode, MethodFuture), (Option<InvokeMode>, SyncError)> {
        let instance = self.objects.pool.find_by_id(object_id).ok_or_else(|| {
            (
                None,
                SyncError::UnknownObject {
                    object_id: object_id.clone(),
                },
            )
        })?;
        let record = self
            .peers
            .get(peer)
            .ok_or_else(|| (None, SyncError::UnknownPeer { peer: peer.clone() }))?;
        let agent = match self.agents.entry(object_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(
                self.objects
                    .registry
                    .create_agent(instance.type_tag())
                    .map_err(|error| (None, error))?,
            ),
        };

        let mode = agent.invoke_mode(method);
        let decoder = ValueDecoder::new(&self.objects.pool);
        let args = decoder
            .deserialize_all(args)
            .map_err(|error| (mode, error))?;
        let future = agent
            .invoke(&instance, method, args, &record.info)
            .map_err(|error| (mode, error))?;
        debug!("Peer {} invoked '{}' on {}", peer, method, object_id);
        Ok((mode.unwrap_or_default(), future))
    }

    fn resolve_result(
        &mut self,
        peer: &ClientToken,
        result: &MethodResultMessage,
    ) -> Result<(), SyncError> {
        let decoder = ValueDecoder::new(&self.objects.pool);
        let record = self
            .peers
            .get_mut(peer)
            .ok_or_else(|| SyncError::UnknownPeer { peer: peer.clone() })?;
        record.invocations.resolve(result, &decoder)
    }

    /// Invokes a declared method of `instance` on `peer`. The call goes out
    /// with the next round; the returned [`PendingResult`] resolves when the
    /// peer answers. Fire-and-forget methods return None.
    pub fn invoke(
        &mut self,
        peer: &ClientToken,
        instance: &Instance,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Option<PendingResult>, SyncError> {
        let Self { objects, peers, .. } = self;
        let record = peers
            .get_mut(peer)
            .ok_or_else(|| SyncError::UnknownPeer { peer: peer.clone() })?;
        let object_id = objects
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

        let wire_args = {
            let info = &record.info;
            let ledger = &mut record.ledger;
            let mut tracker = objects.tracker(info);
            let mut encoder = ValueEncoder::new(&mut tracker, Some(ledger));
            match encode_call(&mut encoder, instance, &args) {
                Ok(wire_args) => {
                    record.pending_introduced.extend(encoder.take_introduced());
                    wire_args
                }
                Err(error) => {
                    encoder.revert_introduced();
                    return Err(error);
                }
            }
        };

        let (correlation_id, pending) = match mode {
            InvokeMode::AwaitReply => {
                let (correlation_id, pending) = record.invocations.begin(&object_id, method);
                (correlation_id, Some(pending))
            }
            InvokeMode::FireAndForget => (record.invocations.next_correlation_id(), None),
        };
        record.outbox.push(SyncMessage::Invoke {
            object_id,
            method: method.to_string(),
            args: wire_args,
            correlation_id,
        });
        Ok(pending)
    }

    /// One full round with `peer`: sends its batch over `transport` and
    /// applies what comes back. If the transport fails, the peer is
    /// described from scratch on the next round.
    pub async fn synchronize(
        &mut self,
        peer: &ClientToken,
        transport: &dyn Transport,
    ) -> Result<ApplyReport, SyncError> {
        let outgoing = self.get_messages(peer)?;
        let sent = outgoing.clone();
        let replies = match transport.send_to_client(peer, outgoing).await {
            Ok(replies) => replies,
            Err(error) => {
                warn!("Round with peer {} failed: {}", peer, error);
                self.requeue(peer, sent);
                return Err(error.into());
            }
        };
        self.apply_messages(peer, replies).await
    }

    fn requeue(&mut self, peer: &ClientToken, lost: Vec<SyncMessage>) {
        let Some(record) = self.peers.get_mut(peer) else {
            return;
        };
        record.ledger.clear_stored_references(None);
        for message in lost {
            match message {
                SyncMessage::Delete { object_id } => {
                    record.pending_deletes.insert(object_id);
                }
                SyncMessage::Invoke { .. } | SyncMessage::Result(_) => record.outbox.push(message),
                SyncMessage::Create { .. } | SyncMessage::Change { .. } => {}
            }
        }
    }
}

fn encode_call(
    encoder: &mut ValueEncoder<'_>,
    target: &Instance,
    args: &[Value],
) -> Result<Vec<WireValue>, SyncError> {
    // the peer needs the target described before the call arrives
    encoder.serialize(&Value::from(target))?;
    encoder.serialize_all(args)
}
