// Debounced, best-effort persistence. The queue's backing record is rewritten
// at most once per `interval_ms` once it's been marked dirty; a failed write
// is logged and retried on the next due tick -- it never stalls the engine.

use nmeshed_base::WallClock;
use tracing::warn;

use crate::store::PersistentStore;

pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

pub struct DebouncedPersister {
    interval_ms: u64,
    dirty: bool,
    last_persist_at: Option<u64>,
}

impl DebouncedPersister {
    pub fn new(interval_ms: u64) -> Self {
        DebouncedPersister {
            interval_ms,
            dirty: false,
            last_persist_at: None,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn due(&self, now: u64) -> bool {
        match self.last_persist_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval_ms,
        }
    }

    /// Writes `bytes` to `storage_key` if dirty and the debounce window has
    /// elapsed. Returns whether a write was attempted.
    pub fn maybe_persist(
        &mut self,
        wall: &dyn WallClock,
        store: &dyn PersistentStore,
        storage_key: &str,
        bytes: &[u8],
    ) -> bool {
        let now = wall.now_millis();
        if !self.dirty || !self.due(now) {
            return false;
        }
        match store.put(storage_key, bytes) {
            Ok(()) => self.dirty = false,
            Err(e) => warn!(target: "nmeshed", error = %e, "queue persistence failed, will retry"),
        }
        self.last_persist_at = Some(now);
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::MemoryStore;
    use nmeshed_base::FakeClock;
    use test_log::test;

    #[test]
    fn test_skips_when_not_dirty() {
        let mut p = DebouncedPersister::new(200);
        let clock = FakeClock::new(0);
        let store = MemoryStore::new();
        assert!(!p.maybe_persist(&clock, &store, "k", b"x"));
    }

    #[test]
    fn test_persists_once_dirty_and_due() {
        let mut p = DebouncedPersister::new(200);
        let clock = FakeClock::new(1000);
        let store = MemoryStore::new();
        p.mark_dirty();
        assert!(p.maybe_persist(&clock, &store, "k", b"x"));
        assert_eq!(store.get("k").unwrap(), Some(b"x".to_vec()));
        assert!(!p.is_dirty());
    }

    #[test]
    fn test_debounces_rapid_dirty_marks() {
        let mut p = DebouncedPersister::new(200);
        let clock = FakeClock::new(1000);
        let store = MemoryStore::new();
        p.mark_dirty();
        assert!(p.maybe_persist(&clock, &store, "k", b"first"));

        p.mark_dirty();
        clock.advance(50);
        assert!(!p.maybe_persist(&clock, &store, "k", b"second"));
        assert_eq!(store.get("k").unwrap(), Some(b"first".to_vec()));

        clock.advance(200);
        assert!(p.maybe_persist(&clock, &store, "k", b"second"));
        assert_eq!(store.get("k").unwrap(), Some(b"second".to_vec()));
    }
}
