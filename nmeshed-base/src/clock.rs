use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock milliseconds-since-epoch. Everything in this crate
/// that needs physical time takes one of these instead of calling
/// `SystemTime::now()` directly, so reconnect backoff, heartbeat timeouts and
/// the hybrid clock can be driven deterministically under test. This crate's
/// cooperative single-threaded model means every suspension point is an
/// explicit, externally-driven step.
pub trait WallClock {
    fn now_millis(&self) -> u64;
}

#[derive(Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock that only advances when told to. Used to simulate backward wall
/// jumps (scenario 6) and to drive deterministic chaos-network
/// tests without real sleeps.
#[derive(Clone)]
pub struct FakeClock(Rc<Cell<u64>>);

impl FakeClock {
    pub fn new(start_millis: u64) -> Self {
        FakeClock(Rc::new(Cell::new(start_millis)))
    }

    pub fn set(&self, millis: u64) {
        self.0.set(millis);
    }

    pub fn advance(&self, delta_millis: u64) {
        self.0.set(self.0.get() + delta_millis);
    }
}

impl WallClock for FakeClock {
    fn now_millis(&self) -> u64 {
        self.0.get()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn test_fake_clock_advances() {
        let clock = FakeClock::new(1000);
        assert_eq!(clock.now_millis(), 1000);
        clock.advance(500);
        assert_eq!(clock.now_millis(), 1500);
        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
    }
}
