// Chaos-network convergence test: ten participants, fifty random writes
// across five keys, 5-50 tick delays, no drops. Every participant's engine
// must agree with participant 0's once the network drains.

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use nmeshed_base::{FakeClock, ParticipantId, WallClock, WorkspaceId};
    use nmeshed_core::SyncMode;
    use nmeshed_net::{ChaosConfig, ChaosNetwork, JitterSource};
    use nmeshed_queue::MemoryStore;
    use nmeshed_view::StateSource;
    use test_log::test;

    use crate::engine::{EngineConfig, SyncEngine};

    const PARTICIPANTS: usize = 10;
    const KEYS: usize = 5;
    const WRITES: usize = 50;

    /// xorshift64*, seeded the same way every run so a convergence failure
    /// is always reproducible.
    struct Rng(Cell<u64>);

    impl Rng {
        fn new(seed: u64) -> Self {
            Rng(Cell::new(seed))
        }

        fn next_u64(&self) -> u64 {
            let mut x = self.0.get();
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0.set(x);
            x
        }

        fn next_range(&self, n: usize) -> usize {
            (self.next_u64() as usize) % n
        }
    }

    impl JitterSource for Rng {
        fn unit_sample(&self) -> f64 {
            (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
        }
    }

    fn make_engine(index: usize, wall: Rc<dyn WallClock>) -> SyncEngine {
        let store: Rc<dyn nmeshed_queue::PersistentStore> = Rc::new(MemoryStore::new());
        let mut engine = SyncEngine::new(
            EngineConfig {
                workspace: WorkspaceId::from_bytes([7; 16]),
                local: ParticipantId::from(format!("p{index}")),
                mode: SyncMode::Collaborative,
                max_queue_size: 0,
                persist_debounce_ms: 0,
            },
            store,
            wall,
        );
        engine.boot().unwrap();
        engine
    }

    #[test]
    fn test_ten_participants_converge_after_chaos_network_drains() {
        let rng = Rng::new(0x9E3779B97F4A7C15);
        let clock = FakeClock::new(0);
        let wall: Rc<dyn WallClock> = Rc::new(clock.clone());
        let mut engines: Vec<SyncEngine> = (0..PARTICIPANTS).map(|i| make_engine(i, wall.clone())).collect();
        let mut chaos = ChaosNetwork::new(ChaosConfig {
            drop_rate: 0.0,
            min_delay_ticks: 5,
            max_delay_ticks: 50,
        });

        let mut writes_issued = 0;
        let mut tick: u64 = 0;
        while writes_issued < WRITES {
            clock.set(tick);

            let writer = rng.next_range(PARTICIPANTS);
            let key = format!("k{}", rng.next_range(KEYS));
            let value = vec![(writes_issued % 256) as u8, (tick % 256) as u8];
            engines[writer].set(&key, Some(value)).unwrap();
            engines[writer]
                .flush_queue(|bytes| {
                    chaos.broadcast(writer, PARTICIPANTS, bytes, tick, &rng);
                    Ok(())
                })
                .unwrap();
            writes_issued += 1;

            deliver_due(&mut chaos, &mut engines, tick);
            tick += 1;
        }

        // Drain whatever is still in flight; the longest possible delay is
        // max_delay_ticks, so running that many extra ticks empties the network.
        for _ in 0..70 {
            clock.set(tick);
            deliver_due(&mut chaos, &mut engines, tick);
            tick += 1;
        }
        assert_eq!(chaos.pending_count(), 0, "chaos network failed to drain in time");

        let reference: Vec<(String, Vec<u8>)> = engines[0].scan_prefix("k");
        for (i, engine) in engines.iter().enumerate().skip(1) {
            let state = engine.scan_prefix("k");
            assert_eq!(state, reference, "participant {i} diverged from participant 0");
        }
    }

    fn deliver_due(chaos: &mut ChaosNetwork, engines: &mut [SyncEngine], now: u64) {
        for (_from, to, bytes) in chaos.deliver_due(now) {
            engines[to].apply_raw_message(&bytes);
        }
    }
}
