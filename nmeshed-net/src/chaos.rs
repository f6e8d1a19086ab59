// Deterministic chaos network: drop, delay and reorder messages among a
// fixed set of participants, driven entirely by an injected `JitterSource`
// so a convergence run is exactly reproducible. Lives here (not behind
// `#[cfg(test)]`) so other crates' own test modules can drive a simulated
// fleet without depending on a real transport.

use crate::backoff::JitterSource;

pub struct ChaosConfig {
    pub drop_rate: f64,
    pub min_delay_ticks: u64,
    pub max_delay_ticks: u64,
}

struct InFlight {
    deliver_at: u64,
    reorder_key: u64,
    from: usize,
    to: usize,
    bytes: Vec<u8>,
}

pub struct ChaosNetwork {
    config: ChaosConfig,
    inflight: Vec<InFlight>,
}

impl ChaosNetwork {
    pub fn new(config: ChaosConfig) -> Self {
        ChaosNetwork {
            config,
            inflight: Vec::new(),
        }
    }

    /// Queues `bytes` for delivery from `from` to `to`, subject to drop and
    /// delay. `jitter` supplies three independent [0,1) samples: drop
    /// decision, delay magnitude, reorder tie-break.
    pub fn send(&mut self, from: usize, to: usize, bytes: Vec<u8>, now: u64, jitter: &dyn JitterSource) {
        if jitter.unit_sample() < self.config.drop_rate {
            return;
        }
        let span = self.config.max_delay_ticks.saturating_sub(self.config.min_delay_ticks);
        let delay = self.config.min_delay_ticks + (jitter.unit_sample() * span as f64) as u64;
        let reorder_key = (jitter.unit_sample() * u64::MAX as f64) as u64;
        self.inflight.push(InFlight {
            deliver_at: now + delay,
            reorder_key,
            from,
            to,
            bytes,
        });
    }

    /// Broadcasts `bytes` from `from` to every other participant in
    /// `[0, participant_count)`.
    pub fn broadcast(&mut self, from: usize, participant_count: usize, bytes: &[u8], now: u64, jitter: &dyn JitterSource) {
        for to in 0..participant_count {
            if to != from {
                self.send(from, to, bytes.to_vec(), now, jitter);
            }
        }
    }

    /// Drains every message due at or before `now`, in an order determined
    /// by each message's `reorder_key` rather than send order.
    pub fn deliver_due(&mut self, now: u64) -> Vec<(usize, usize, Vec<u8>)> {
        let mut ready = Vec::new();
        let mut remaining = Vec::new();
        for item in self.inflight.drain(..) {
            if item.deliver_at <= now {
                ready.push(item);
            } else {
                remaining.push(item);
            }
        }
        self.inflight = remaining;
        ready.sort_by_key(|item| item.reorder_key);
        ready.into_iter().map(|item| (item.from, item.to, item.bytes)).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.inflight.len()
    }
}
