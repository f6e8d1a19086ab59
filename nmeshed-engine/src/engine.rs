// The orchestrator. Holds the core, the queue, the ring/authority, the
// router, the clock and a schema registry, and drives the lifecycle state
// machine. Single-threaded, cooperative: every effect happens inside `boot`,
// `set`, `apply_raw_message` or `tick`, never off a background task.

use std::rc::Rc;

use nmeshed_base::{
    err, invalid_transition_err, Error, EventBus, ParticipantId, SubscriptionId, WallClock,
    WorkspaceId,
};
use nmeshed_clock::{HorizonTracker, HybridLogicalClock};
use nmeshed_core::{ApplyEffect, ReplicationCore, SyncMode};
use nmeshed_queue::{queue_storage_key, DebouncedPersister, OperationQueue, PersistentStore};
use nmeshed_ring::{AuthorityManager, ConsistentHashRing};
use nmeshed_view::{OpEvent, StateSource};
use nmeshed_wire::{MessageRouter, ParsedMessage, SyncPayload};
use tracing::{debug, warn};

use crate::schema::SchemaRegistry;
use crate::state::EngineState;

pub struct EngineConfig {
    pub workspace: WorkspaceId,
    pub local: ParticipantId,
    pub mode: SyncMode,
    pub max_queue_size: usize,
    pub persist_debounce_ms: u64,
}

pub struct SyncEngine {
    state: EngineState,
    core: ReplicationCore,
    queue: OperationQueue,
    max_queue_size: usize,
    persister: DebouncedPersister,
    store: Rc<dyn PersistentStore>,
    wall: Rc<dyn WallClock>,
    ring: ConsistentHashRing,
    authority: AuthorityManager,
    router: MessageRouter,
    clock: HybridLogicalClock,
    horizon: HorizonTracker,
    schema: SchemaRegistry,
    workspace: WorkspaceId,
    local: ParticipantId,
    storage_key: String,
    boot_queue: Vec<Vec<u8>>,
    ops_events: EventBus<OpEvent>,
    state_change: EventBus<(EngineState, EngineState)>,
}

impl SyncEngine {
    pub fn new(config: EngineConfig, store: Rc<dyn PersistentStore>, wall: Rc<dyn WallClock>) -> Self {
        let storage_key = queue_storage_key(&config.workspace);
        SyncEngine {
            state: EngineState::Idle,
            core: ReplicationCore::new(config.workspace, config.local.clone(), config.mode),
            queue: OperationQueue::new(config.max_queue_size),
            max_queue_size: config.max_queue_size,
            persister: DebouncedPersister::new(config.persist_debounce_ms),
            store,
            wall,
            ring: ConsistentHashRing::default(),
            authority: AuthorityManager::new(config.local.clone()),
            router: MessageRouter::new(),
            clock: HybridLogicalClock::new(&config.local),
            horizon: HorizonTracker::new(),
            schema: SchemaRegistry::new(),
            workspace: config.workspace,
            local: config.local,
            storage_key,
            boot_queue: Vec::new(),
            ops_events: EventBus::new(),
            state_change: EventBus::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn ring_mut(&mut self) -> &mut ConsistentHashRing {
        &mut self.ring
    }

    pub fn authority(&self) -> &AuthorityManager {
        &self.authority
    }

    pub fn register_schema(&mut self, prefix: impl Into<String>, codec: Box<dyn crate::schema::SchemaCodec>) {
        self.schema.register(prefix, codec);
    }

    pub fn subscribe_state_change(
        &mut self,
        listener: impl FnMut(&(EngineState, EngineState)) + 'static,
    ) -> SubscriptionId {
        self.state_change.subscribe(listener)
    }

    fn enter(&mut self, next: EngineState) -> Result<(), Error> {
        let next = self.state.transition(next)?;
        let prev = self.state;
        self.state = next;
        self.state_change.emit(&(prev, next));
        Ok(())
    }

    /// Rehydrates the queue from the store, replays any pre-connect entries
    /// through the core (converting them to frame entries in place), drains
    /// anything buffered in `boot_queue` as if it had just arrived, and
    /// transitions IDLE/STOPPED -> BOOTING -> ACTIVE.
    pub fn boot(&mut self) -> Result<(), Error> {
        self.enter(EngineState::Booting)?;

        let persisted = self.store.get(&self.storage_key)?;
        if let Some(bytes) = persisted {
            let rehydrated = OperationQueue::rehydrate(self.max_queue_size, &bytes)?;
            let pre_boot_entries = self.queue.snapshot();
            self.queue = rehydrated;
            for entry in pre_boot_entries {
                self.queue.enqueue(entry);
            }
        }

        self.convert_pre_connect_entries()?;

        let buffered = std::mem::take(&mut self.boot_queue);
        for bytes in buffered {
            self.dispatch_raw_message(&bytes);
        }

        self.enter(EngineState::Active)
    }

    fn convert_pre_connect_entries(&mut self) -> Result<(), Error> {
        let snapshot = self.queue.snapshot();
        let mut converted = OperationQueue::new(self.max_queue_size);
        for entry in snapshot {
            match entry {
                nmeshed_queue::QueueEntry::PreConnect { key, value } => {
                    let encoded = match &value {
                        Some(v) => Some(self.schema.encode_for(&key, v)?),
                        None => None,
                    };
                    let ts = self.clock.now(self.wall.as_ref());
                    let frame = self.core.apply_local(&key, encoded.clone(), ts)?;
                    self.ops_events.emit(&OpEvent { key, value: encoded });
                    converted.enqueue(nmeshed_queue::QueueEntry::Frame(frame));
                }
                frame @ nmeshed_queue::QueueEntry::Frame(_) => converted.enqueue(frame),
            }
        }
        self.queue = converted;
        self.persister.mark_dirty();
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: Option<Vec<u8>>) -> Result<(), Error> {
        match self.state {
            EngineState::Destroyed => Err(invalid_transition_err("set() called on destroyed engine")),
            EngineState::Idle | EngineState::Booting => {
                self.queue.enqueue(nmeshed_queue::QueueEntry::PreConnect {
                    key: key.to_string(),
                    value,
                });
                Ok(())
            }
            EngineState::Active => {
                let encoded = match &value {
                    Some(v) => Some(self.schema.encode_for(key, v)?),
                    None => None,
                };
                let ts = self.clock.now(self.wall.as_ref());
                let frame = self.core.apply_local(key, encoded.clone(), ts)?;
                self.queue.enqueue(nmeshed_queue::QueueEntry::Frame(frame));
                self.persister.mark_dirty();
                self.ops_events.emit(&OpEvent {
                    key: key.to_string(),
                    value: encoded,
                });
                Ok(())
            }
            EngineState::Stopping | EngineState::Stopped => {
                Err(invalid_transition_err("set() called while engine is not active"))
            }
        }
    }

    pub fn apply_raw_message(&mut self, bytes: &[u8]) {
        match self.state {
            EngineState::Destroyed => {}
            EngineState::Idle | EngineState::Booting => self.boot_queue.push(bytes.to_vec()),
            _ => self.dispatch_raw_message(bytes),
        }
    }

    fn dispatch_raw_message(&mut self, bytes: &[u8]) {
        let Some(parsed) = self.router.parse(bytes) else {
            warn!(target: "nmeshed", "dropped malformed or undecodable frame");
            return;
        };
        match parsed {
            ParsedMessage::Op(_) => match self.core.apply_remote(bytes) {
                Ok(ApplyEffect::Applied { key, value, .. }) => {
                    let decoded = match &value {
                        Some(v) => match self.schema.decode_for(&key, v) {
                            Ok(d) => Some(d),
                            Err(e) => {
                                warn!(target: "nmeshed", error = %e, "schema decode failed, delivering raw bytes");
                                Some(v.clone())
                            }
                        },
                        None => None,
                    };
                    self.ops_events.emit(&OpEvent { key, value: decoded });
                }
                Ok(ApplyEffect::Dominated) => {
                    debug!(target: "nmeshed", "remote op dominated, ignored");
                }
                Err(e) => {
                    warn!(target: "nmeshed", error = %e, "failed to apply remote op");
                }
            },
            ParsedMessage::Sync(SyncPayload::Snapshot(_)) => {
                if let Err(e) = self.core.apply_binary_snapshot(bytes) {
                    warn!(target: "nmeshed", error = %e, "failed to apply snapshot");
                }
            }
            ParsedMessage::Sync(SyncPayload::StateVector(entries)) => {
                let mut heads = nmeshed_clock::Heads::new();
                for (peer, seq) in entries {
                    heads.insert(peer, seq);
                }
                // Attribute the reported vector to a synthetic key so
                // per-peer tracking stays simple; callers that need the
                // originating peer identity route this through
                // `record_peer` directly via the connection orchestrator.
                self.horizon.record_peer(self.local.clone(), heads);
            }
            ParsedMessage::Sync(SyncPayload::AckSeq(seq)) => {
                debug!(target: "nmeshed", seq, "ack received");
            }
            ParsedMessage::Heartbeat => {}
            ParsedMessage::Presence(_)
            | ParsedMessage::Signal(_)
            | ParsedMessage::Init(_)
            | ParsedMessage::ActorRegistry(_)
            | ParsedMessage::ColumnarBatch(_)
            | ParsedMessage::Unknown => {
                debug!(target: "nmeshed", "message forwarded to secondary channel, not core state");
            }
        }
    }

    pub fn record_peer_vector(&mut self, peer: ParticipantId, heads: nmeshed_clock::Heads) {
        self.horizon.record_peer(peer, heads);
    }

    pub fn prune_horizon(&mut self) {
        let horizon = self.horizon.horizon(&self.vector_clock_snapshot());
        self.core.prune(&horizon);
    }

    fn vector_clock_snapshot(&self) -> nmeshed_clock::VectorClock {
        // ReplicationCore only exposes `heads()`; rebuild a VectorClock from
        // it for HorizonTracker's signature.
        let mut vc = nmeshed_clock::VectorClock::new();
        for (writer, seq) in self.core.heads() {
            vc.observe(&writer, seq);
        }
        vc
    }

    pub fn flush_queue(&mut self, mut send: impl FnMut(&[u8]) -> Result<(), Error>) -> Result<usize, Error> {
        self.queue.flush(|entry| match entry {
            nmeshed_queue::QueueEntry::Frame(bytes) => send(bytes),
            nmeshed_queue::QueueEntry::PreConnect { .. } => {
                Err(err("pre-connect entry survived into active flush, engine invariant violated"))
            }
        })
    }

    pub fn tick(&mut self) {
        let bytes = self.queue.encode();
        self.persister
            .maybe_persist(self.wall.as_ref(), self.store.as_ref(), &self.storage_key, &bytes);
    }

    pub fn stop(&mut self) -> Result<(), Error> {
        if self.state == EngineState::Idle {
            return Err(invalid_transition_err("stop() called while engine is idle"));
        }
        self.enter(EngineState::Stopping)?;
        self.enter(EngineState::Stopped)
    }

    /// Unconditional, idempotent transition to DESTROYED from any state.
    pub fn destroy(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        let prev = self.state;
        self.state = EngineState::Destroyed;
        self.state_change.emit(&(prev, EngineState::Destroyed));
        self.queue = OperationQueue::new(0);
    }

    pub fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    pub fn local(&self) -> &ParticipantId {
        &self.local
    }
}

impl StateSource for SyncEngine {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.core
            .record(key)
            .and_then(|rec| rec.value.clone())
            .map(|v| self.schema.decode_for(key, &v).unwrap_or(v))
    }

    fn scan_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        self.core
            .get_state()
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| {
                let decoded = self.schema.decode_for(&k, &v).unwrap_or_else(|_| v.clone());
                (k, decoded)
            })
            .collect()
    }

    fn set(&mut self, key: &str, value: Option<Vec<u8>>) -> Result<(), Error> {
        self.set(key, value)
    }

    fn subscribe_ops(&mut self, listener: Box<dyn FnMut(&OpEvent)>) -> SubscriptionId {
        self.ops_events.subscribe(listener)
    }

    fn unsubscribe_ops(&mut self, id: SubscriptionId) {
        self.ops_events.unsubscribe(id);
    }
}
