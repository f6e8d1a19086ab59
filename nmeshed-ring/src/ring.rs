// Consistent hash ring. add_node/remove_node insert/remove R
// virtual points at hash(id ++ i) for i in [0,R); owner(key) binary-searches
// the sorted point list. Bounded reshuffling: about 1/N keys move on
// membership change, deterministic across participants since everyone hashes
// the same way.

use nmeshed_base::ParticipantId;

pub const DEFAULT_VIRTUAL_NODES: u32 = 20;

fn hash_point(id: &ParticipantId, virtual_index: u32) -> u64 {
    let mut buf = Vec::with_capacity(id.as_str().len() + 4);
    buf.extend_from_slice(id.as_str().as_bytes());
    buf.extend_from_slice(&virtual_index.to_le_bytes());
    rapidhash::rapidhash(&buf)
}

pub fn hash_key(key: &str) -> u64 {
    rapidhash::rapidhash(key.as_bytes())
}

#[derive(Clone, Debug)]
pub struct ConsistentHashRing {
    virtual_nodes: u32,
    // Sorted by hash point; ties broken by node id so the ring is a total
    // order even under hash collisions.
    points: Vec<(u64, ParticipantId)>,
}

impl Default for ConsistentHashRing {
    fn default() -> Self {
        ConsistentHashRing::new(DEFAULT_VIRTUAL_NODES)
    }
}

impl ConsistentHashRing {
    pub fn new(virtual_nodes: u32) -> Self {
        ConsistentHashRing {
            virtual_nodes,
            points: Vec::new(),
        }
    }

    pub fn add_node(&mut self, id: ParticipantId) {
        for i in 0..self.virtual_nodes {
            let point = hash_point(&id, i);
            let pos = self
                .points
                .partition_point(|(h, n)| (*h, n) < (point, id.clone()));
            self.points.insert(pos, (point, id.clone()));
        }
    }

    pub fn remove_node(&mut self, id: &ParticipantId) {
        self.points.retain(|(_, n)| n != id);
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn nodes(&self) -> std::collections::BTreeSet<ParticipantId> {
        self.points.iter().map(|(_, n)| n.clone()).collect()
    }

    /// First node in sorted-by-hash ring at-or-after hash(key), wrapping
    /// around to the first point if the key's hash is past every point.
    pub fn owner(&self, key: &str) -> Option<ParticipantId> {
        if self.points.is_empty() {
            return None;
        }
        let h = hash_key(key);
        let idx = self.points.partition_point(|(point, _)| *point < h);
        let idx = if idx == self.points.len() { 0 } else { idx };
        Some(self.points[idx].1.clone())
    }
}
