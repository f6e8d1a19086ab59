// Thin wrapper wiring a SyncEngine to a TransportDriver. On `connected`,
// boots the engine if it isn't active yet and flushes the queue; on
// `message`, hands bytes straight to the engine; reconnects and drops leave
// the engine ACTIVE so writes keep queuing locally.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use nmeshed_base::Error;
use nmeshed_net::{JitterSource, RawChannel, TransportConfig, TransportDriver, TransportEvent, TransportStatus};
use tracing::warn;

use crate::engine::SyncEngine;
use crate::state::EngineState;

pub struct ConnectionOrchestrator<C, J> {
    engine: Rc<RefCell<SyncEngine>>,
    transport: TransportDriver<C, J>,
    pending: Rc<RefCell<VecDeque<TransportEvent>>>,
}

impl<C: RawChannel, J: JitterSource> ConnectionOrchestrator<C, J> {
    pub fn new(engine: SyncEngine, config: TransportConfig, channel: C, jitter: J) -> Self {
        Self::with_shared_engine(Rc::new(RefCell::new(engine)), config, channel, jitter)
    }

    /// Wires an already-shared engine handle, so a caller holding the same
    /// `Rc<RefCell<SyncEngine>>` (for building `Collection`/`Document`
    /// views, say) keeps seeing this orchestrator's effects.
    pub fn with_shared_engine(
        engine: Rc<RefCell<SyncEngine>>,
        config: TransportConfig,
        channel: C,
        jitter: J,
    ) -> Self {
        let mut transport = TransportDriver::new(config, channel, jitter);
        let pending = Rc::new(RefCell::new(VecDeque::new()));
        let pending_cb = pending.clone();
        transport.subscribe(move |ev: &TransportEvent| pending_cb.borrow_mut().push_back(ev.clone()));
        ConnectionOrchestrator {
            engine,
            transport,
            pending,
        }
    }

    pub fn engine_handle(&self) -> Rc<RefCell<SyncEngine>> {
        self.engine.clone()
    }

    pub fn transport_status(&self) -> TransportStatus {
        self.transport.status()
    }

    pub fn connect(&mut self, url: String, now: u64) -> Result<(), Error> {
        self.transport.connect(url, now)
    }

    pub fn destroy(&mut self) {
        self.engine.borrow_mut().destroy();
        self.transport.stop();
    }

    pub fn tick(&mut self, now: u64) -> Result<(), Error> {
        self.transport.tick(now);
        self.engine.borrow_mut().tick();

        let drained: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for event in drained {
            self.handle_transport_event(event)?;
        }
        Ok(())
    }

    fn handle_transport_event(&mut self, event: TransportEvent) -> Result<(), Error> {
        match event {
            TransportEvent::Status(TransportStatus::Connected) => {
                let mut engine = self.engine.borrow_mut();
                if engine.state() != EngineState::Active {
                    engine.boot()?;
                }
                let transport = &mut self.transport;
                engine.flush_queue(|bytes| transport.send(bytes))?;
            }
            TransportEvent::Status(TransportStatus::Reconnecting)
            | TransportEvent::Status(TransportStatus::Idle)
            | TransportEvent::Status(TransportStatus::Connecting) => {
                // Engine stays ACTIVE; writes keep queuing locally.
            }
            TransportEvent::Status(TransportStatus::Error) => {
                warn!(target: "nmeshed", "transport entered terminal error state");
            }
            TransportEvent::Message(bytes) => self.engine.borrow_mut().apply_raw_message(&bytes),
            TransportEvent::Error(msg) => {
                warn!(target: "nmeshed", error = %msg, "transport reported an error");
            }
            TransportEvent::PeerJoin(_) | TransportEvent::PeerLeave(_) | TransportEvent::Ephemeral { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nmeshed_base::{FakeClock, ParticipantId, WallClock, WorkspaceId};
    use nmeshed_core::SyncMode;
    use nmeshed_net::{FixedJitter, LoopbackChannel};
    use nmeshed_queue::{MemoryStore, PersistentStore};
    use nmeshed_view::StateSource;
    use test_log::test;

    use crate::engine::EngineConfig;

    fn orchestrator() -> (ConnectionOrchestrator<LoopbackChannel, FixedJitter>, LoopbackChannel) {
        let store: Rc<dyn PersistentStore> = Rc::new(MemoryStore::new());
        let wall: Rc<dyn WallClock> = Rc::new(FakeClock::new(0));
        let engine = SyncEngine::new(
            EngineConfig {
                workspace: WorkspaceId::from_bytes([1; 16]),
                local: ParticipantId::from("A"),
                mode: SyncMode::Collaborative,
                max_queue_size: 0,
                persist_debounce_ms: 0,
            },
            store,
            wall,
        );
        let (a, b) = LoopbackChannel::pair();
        (
            ConnectionOrchestrator::new(engine, TransportConfig::default(), a, FixedJitter(0.5)),
            b,
        )
    }

    #[test]
    fn test_connect_boots_engine_and_flushes_queue() {
        let (mut orch, _peer) = orchestrator();
        let engine = orch.engine_handle();
        engine.borrow_mut().set("k", Some(b"v".to_vec())).unwrap();
        assert_eq!(engine.borrow().state(), EngineState::Idle);

        orch.connect("loopback://x".to_string(), 0).unwrap();
        orch.tick(0).unwrap();

        assert_eq!(engine.borrow().state(), EngineState::Active);
        assert_eq!(orch.transport_status(), TransportStatus::Connected);
    }

    #[test]
    fn test_incoming_message_forwarded_to_engine() {
        use nmeshed_clock::HybridTimestamp;
        use nmeshed_wire::Operation;

        let (mut orch, mut peer) = orchestrator();
        let engine = orch.engine_handle();
        orch.connect("loopback://x".to_string(), 0).unwrap();
        orch.tick(0).unwrap();

        let op = Operation {
            workspace: WorkspaceId::from_bytes([1; 16]),
            key: "k".to_string(),
            value: Some(vec![9]),
            timestamp: HybridTimestamp::new(100, 0, 1),
            writer: ParticipantId::from("B"),
            sequence: 1,
            is_delete: false,
        };
        peer.send(&op.to_bytes().unwrap()).unwrap();
        orch.tick(1).unwrap();

        assert_eq!(engine.borrow().get("k"), Some(vec![9]));
    }

    #[test]
    fn test_destroy_propagates_to_engine_and_transport() {
        let (mut orch, _peer) = orchestrator();
        let engine = orch.engine_handle();
        orch.connect("loopback://x".to_string(), 0).unwrap();
        orch.tick(0).unwrap();
        orch.destroy();
        assert_eq!(engine.borrow().state(), EngineState::Destroyed);
        assert_eq!(orch.transport_status(), TransportStatus::Idle);
    }
}
