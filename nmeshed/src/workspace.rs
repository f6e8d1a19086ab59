// Wires a `Config` into a live `SyncEngine` + `ConnectionOrchestrator` pair
// and exposes the read surface (`get`/`collection`/`document`) views need.
// One `Workspace` per `workspace_id`, matching the "persistent store owned
// exclusively by the engine per workspace" shared-resource policy.

use std::cell::RefCell;
use std::rc::Rc;

use nmeshed_base::{Error, ParticipantId, WallClock, WorkspaceId};
use nmeshed_engine::{ConnectionOrchestrator, EngineConfig, EngineState, SchemaCodec, SyncEngine};
use nmeshed_net::{build_sync_url, JitterSource, RawChannel, TransportConfig};
use nmeshed_queue::PersistentStore;
use nmeshed_view::{Collection, Document, StateSource};

use crate::config::Config;

fn derive_workspace_id(raw: &str) -> WorkspaceId {
    let lo = rapidhash::rapidhash(raw.as_bytes());
    let hi = rapidhash::rapidhash(format!("{raw}\0nmeshed-salt").as_bytes());
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&lo.to_le_bytes());
    bytes[8..].copy_from_slice(&hi.to_le_bytes());
    WorkspaceId::from_bytes(bytes)
}

fn resolve_participant_id(config: &Config) -> ParticipantId {
    match &config.participant_id {
        Some(id) => ParticipantId::from(id.clone()),
        None => ParticipantId::from(uuid::Uuid::new_v4().to_string()),
    }
}

pub struct Workspace<C, J> {
    orchestrator: ConnectionOrchestrator<C, J>,
    engine: Rc<RefCell<SyncEngine>>,
    server_url: String,
    token: String,
    workspace_id: WorkspaceId,
    participant_id: ParticipantId,
    sync_mode_wire: &'static str,
}

impl<C: RawChannel, J: JitterSource> Workspace<C, J> {
    pub fn new(
        config: Config,
        store: Rc<dyn PersistentStore>,
        wall: Rc<dyn WallClock>,
        channel: C,
        jitter: J,
    ) -> Result<Self, Error> {
        config.validate()?;
        let mode = config.parsed_sync_mode()?;
        let workspace_id = derive_workspace_id(&config.workspace_id);
        let participant_id = resolve_participant_id(&config);

        let engine = SyncEngine::new(
            EngineConfig {
                workspace: workspace_id,
                local: participant_id.clone(),
                mode: mode.to_core(),
                max_queue_size: config.max_queue_size,
                persist_debounce_ms: nmeshed_queue::DEFAULT_DEBOUNCE_MS,
            },
            store,
            wall,
        );
        let engine = Rc::new(RefCell::new(engine));

        let transport_config = TransportConfig {
            connection_timeout_ms: config.connection_timeout_ms,
            heartbeat_interval_ms: config.heartbeat_interval_ms,
            auto_reconnect: config.auto_reconnect,
            max_reconnect_attempts: config.max_reconnect_attempts,
            reconnect_base_delay_ms: config.reconnect_base_delay_ms,
            max_reconnect_delay_ms: config.max_reconnect_delay_ms,
        };
        let orchestrator =
            ConnectionOrchestrator::with_shared_engine(engine.clone(), transport_config, channel, jitter);

        Ok(Workspace {
            orchestrator,
            engine,
            server_url: config.server_url,
            token: config.token,
            workspace_id,
            participant_id,
            sync_mode_wire: mode.wire_str(),
        })
    }

    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn state(&self) -> EngineState {
        self.engine.borrow().state()
    }

    pub fn register_schema(&self, prefix: impl Into<String>, codec: Box<dyn SchemaCodec>) {
        self.engine.borrow_mut().register_schema(prefix, codec);
    }

    /// Assembles the sync URL from the configured server/token/participant
    /// and opens the transport. Booting the engine happens once the
    /// transport reports `Connected`, handled by the orchestrator.
    pub fn connect(&mut self, now: u64) -> Result<(), Error> {
        let url = build_sync_url(
            &self.server_url,
            &self.workspace_id,
            &self.token,
            &self.participant_id,
            self.sync_mode_wire,
        );
        self.orchestrator.connect(url, now)
    }

    pub fn tick(&mut self, now: u64) -> Result<(), Error> {
        self.orchestrator.tick(now)
    }

    pub fn set(&self, key: &str, value: Option<Vec<u8>>) -> Result<(), Error> {
        self.engine.borrow_mut().set(key, value)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.engine.borrow().get(key)
    }

    pub fn collection(&self, prefix: impl Into<String>) -> Collection<SyncEngine> {
        Collection::new(self.engine.clone(), prefix)
    }

    pub fn document(&self, fields: Vec<String>) -> Document<SyncEngine> {
        Document::new(self.engine.clone(), fields)
    }

    pub fn document_single_key(&self, key: impl Into<String>) -> Document<SyncEngine> {
        Document::single_key(self.engine.clone(), key)
    }

    pub fn destroy(&mut self) {
        self.orchestrator.destroy();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nmeshed_base::FakeClock;
    use nmeshed_net::{FixedJitter, LoopbackChannel};
    use nmeshed_queue::MemoryStore;
    use test_log::test;

    fn workspace() -> (Workspace<LoopbackChannel, FixedJitter>, LoopbackChannel) {
        let store: Rc<dyn PersistentStore> = Rc::new(MemoryStore::new());
        let wall: Rc<dyn WallClock> = Rc::new(FakeClock::new(0));
        let config = Config::new("acme-workspace", "secret-token").with_participant_id("alice");
        let (a, b) = LoopbackChannel::pair();
        let ws = Workspace::new(config, store, wall, a, FixedJitter(0.5)).unwrap();
        (ws, b)
    }

    #[test]
    fn test_rejects_invalid_config_before_touching_transport() {
        let store: Rc<dyn PersistentStore> = Rc::new(MemoryStore::new());
        let wall: Rc<dyn WallClock> = Rc::new(FakeClock::new(0));
        let config = Config::new("", "tok");
        let (a, _b) = LoopbackChannel::pair();
        let result = Workspace::new(config, store, wall, a, FixedJitter(0.5));
        assert!(result.is_err());
    }

    #[test]
    fn test_connect_boots_and_set_is_visible_through_get() {
        let (mut ws, _peer) = workspace();
        ws.set("doc:1/title", Some(b"hello".to_vec())).unwrap();
        assert_eq!(ws.state(), EngineState::Idle);

        ws.connect(0).unwrap();
        ws.tick(0).unwrap();

        assert_eq!(ws.state(), EngineState::Active);
        assert_eq!(ws.get("doc:1/title"), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_collection_reflects_live_engine_state() {
        let (mut ws, _peer) = workspace();
        ws.connect(0).unwrap();
        ws.tick(0).unwrap();
        ws.set("doc:1/a", Some(b"1".to_vec())).unwrap();
        ws.set("doc:2/a", Some(b"2".to_vec())).unwrap();

        let coll = ws.collection("doc:");
        assert_eq!(coll.data().len(), 2);
    }

    #[test]
    fn test_explicit_participant_id_is_used_verbatim() {
        let (ws, _peer) = workspace();
        assert_eq!(ws.participant_id().as_str(), "alice");
    }

    #[test]
    fn test_participant_id_generated_when_absent() {
        let store: Rc<dyn PersistentStore> = Rc::new(MemoryStore::new());
        let wall: Rc<dyn WallClock> = Rc::new(FakeClock::new(0));
        let config = Config::new("acme-workspace", "secret-token");
        let (a, _b) = LoopbackChannel::pair();
        let ws = Workspace::new(config, store, wall, a, FixedJitter(0.5)).unwrap();
        assert!(!ws.participant_id().as_str().is_empty());
    }

    #[test]
    fn test_destroy_propagates_to_state() {
        let (mut ws, _peer) = workspace();
        ws.connect(0).unwrap();
        ws.tick(0).unwrap();
        ws.destroy();
        assert_eq!(ws.state(), EngineState::Destroyed);
    }
}
