// Vector clock and prune horizon. A VectorClock is a mapping
// participant -> last-observed sequence. The horizon is the componentwise
// minimum across the local vector and every vector we've heard reported by a
// peer; anything at-or-below the horizon can never again be legitimately
// superseded by a future delivery, so it's safe to compact out of history.

use std::collections::BTreeMap;

use nmeshed_base::ParticipantId;

pub type Heads = BTreeMap<ParticipantId, u64>;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VectorClock {
    counters: Heads,
}

impl VectorClock {
    pub fn new() -> Self {
        VectorClock::default()
    }

    /// Local write: increments the self-entry strictly and returns the new
    /// sequence number.
    pub fn increment(&mut self, writer: &ParticipantId) -> u64 {
        let entry = self.counters.entry(writer.clone()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Remote apply: `vc[writer] := max(vc[writer], seq)`.
    pub fn observe(&mut self, writer: &ParticipantId, seq: u64) {
        let entry = self.counters.entry(writer.clone()).or_insert(0);
        if seq > *entry {
            *entry = seq;
        }
    }

    pub fn get(&self, writer: &ParticipantId) -> u64 {
        *self.counters.get(writer).unwrap_or(&0)
    }

    /// Immutable snapshot of the set of observed heads.
    pub fn heads(&self) -> Heads {
        self.counters.clone()
    }
}

/// Tracks the last vector reported by each known peer, and computes the
/// prune horizon: the componentwise minimum across the local vector and all
/// recorded peer vectors, treating missing components as 0.
#[derive(Clone, Debug, Default)]
pub struct HorizonTracker {
    peers: BTreeMap<ParticipantId, Heads>,
}

impl HorizonTracker {
    pub fn new() -> Self {
        HorizonTracker::default()
    }

    pub fn record_peer(&mut self, peer: ParticipantId, vector: Heads) {
        self.peers.insert(peer, vector);
    }

    pub fn horizon(&self, local: &VectorClock) -> Heads {
        let local_heads = local.heads();
        let mut writers: std::collections::BTreeSet<&ParticipantId> =
            local_heads.keys().collect();
        for v in self.peers.values() {
            writers.extend(v.keys());
        }

        let mut horizon = Heads::new();
        for writer in writers {
            let mut min = *local_heads.get(writer).unwrap_or(&0);
            for peer_vec in self.peers.values() {
                let seq = *peer_vec.get(writer).unwrap_or(&0);
                if seq < min {
                    min = seq;
                }
            }
            horizon.insert(writer.clone(), min);
        }
        horizon
    }
}

/// `(writer, seq)` is safe to discard iff `horizon[writer] >= seq`.
pub fn is_dominated_by_horizon(horizon: &Heads, writer: &ParticipantId, seq: u64) -> bool {
    *horizon.get(writer).unwrap_or(&0) >= seq
}
