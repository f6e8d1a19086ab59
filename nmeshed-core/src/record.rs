use nmeshed_base::ParticipantId;
use nmeshed_clock::HybridTimestamp;

/// Per-key CRDT state. `last_timestamp` is the hybrid timestamp of whichever
/// op currently owns the key; conflicts are resolved by strict hybrid
/// ordering, ties broken by writer lexicographic order.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyRecord {
    pub value: Option<Vec<u8>>,
    pub last_timestamp: HybridTimestamp,
    pub last_writer: ParticipantId,
    pub last_seq: u64,
}

impl KeyRecord {
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}
