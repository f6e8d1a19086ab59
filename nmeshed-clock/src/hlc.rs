// Hybrid logical clock. Physical is milliseconds since epoch,
// logical counts intra-millisecond events, node is a stable hash of the
// participant id. Ordering is the lexicographic tuple (physical, logical,
// node); the wire layout packs them as physical:48 | logical:16 | node:64,
// little-endian, but that bit layout is a serialization detail only -- we
// compare the tuple directly rather than relying on the packed integer's
// numeric order, since node sits in the high bits on the wire.

use nmeshed_base::{ParticipantId, WallClock};

const LOGICAL_MAX: u16 = u16::MAX;
const PHYSICAL_MASK: u64 = (1u64 << 48) - 1;

#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct HybridTimestamp {
    pub physical: u64, // low 48 bits significant
    pub logical: u16,
    pub node: u64,
}

impl HybridTimestamp {
    pub fn new(physical: u64, logical: u16, node: u64) -> Self {
        HybridTimestamp {
            physical: physical & PHYSICAL_MASK,
            logical,
            node,
        }
    }

    fn key(&self) -> (u64, u16, u64) {
        (self.physical, self.logical, self.node)
    }

    pub fn to_wire_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..6].copy_from_slice(&self.physical.to_le_bytes()[0..6]);
        out[6..8].copy_from_slice(&self.logical.to_le_bytes());
        out[8..16].copy_from_slice(&self.node.to_le_bytes());
        out
    }

    pub fn from_wire_bytes(bytes: [u8; 16]) -> Self {
        let mut phys_buf = [0u8; 8];
        phys_buf[0..6].copy_from_slice(&bytes[0..6]);
        let physical = u64::from_le_bytes(phys_buf);
        let logical = u16::from_le_bytes([bytes[6], bytes[7]]);
        let node = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        HybridTimestamp::new(physical, logical, node)
    }
}

impl std::fmt::Debug for HybridTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HybridTimestamp{{phys:{},log:{},node:{:x}}}",
            self.physical, self.logical, self.node
        )
    }
}

impl Ord for HybridTimestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for HybridTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Stable 64-bit hash of a participant id, used as the `node` field of every
/// timestamp this clock produces.
pub fn node_hash(participant: &ParticipantId) -> u64 {
    rapidhash::rapidhash(participant.as_str().as_bytes())
}

pub struct HybridLogicalClock {
    node: u64,
    last_phys: u64,
    last_log: u16,
}

impl HybridLogicalClock {
    pub fn new(participant: &ParticipantId) -> Self {
        HybridLogicalClock {
            node: node_hash(participant),
            last_phys: 0,
            last_log: 0,
        }
    }

    fn bump_logical(&mut self) {
        if self.last_log == LOGICAL_MAX {
            self.last_phys += 1;
            self.last_log = 0;
        } else {
            self.last_log += 1;
        }
    }

    /// Returns a strictly monotone timestamp for the local participant.
    pub fn now(&mut self, wall: &dyn WallClock) -> HybridTimestamp {
        let w = wall.now_millis();
        if w > self.last_phys {
            self.last_phys = w;
            self.last_log = 0;
        } else {
            self.bump_logical();
        }
        HybridTimestamp::new(self.last_phys, self.last_log, self.node)
    }

    /// Advances local state to at least the remote's physical time and
    /// returns a new strictly-greater local timestamp.
    pub fn update(&mut self, wall: &dyn WallClock, remote: HybridTimestamp) -> HybridTimestamp {
        let w = wall.now_millis();
        let next_phys = self.last_phys.max(remote.physical).max(w);

        let matches_last = next_phys == self.last_phys;
        let matches_remote = next_phys == remote.physical;

        let next_log = if matches_last && matches_remote {
            self.last_log.max(remote.logical).saturating_add(1)
        } else if matches_last {
            self.last_log.saturating_add(1)
        } else if matches_remote {
            remote.logical.saturating_add(1)
        } else {
            0
        };

        self.last_phys = next_phys;
        self.last_log = next_log;
        HybridTimestamp::new(self.last_phys, self.last_log, self.node)
    }
}
