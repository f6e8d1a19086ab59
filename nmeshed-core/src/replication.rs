// Per-key latest value plus a writer vector, with two modes. `Collaborative`
// is last-writer-wins per key with hybrid-clock tie-break. `Realtime` is fast
// and lossy: tombstones are always accepted, non-tombstone values are
// subject to latest-physical-wins.

use std::collections::BTreeMap;

use nmeshed_base::{err, Error, ParticipantId, WorkspaceId};
use nmeshed_clock::{Heads, VectorClock};
use nmeshed_wire::{FrameType, Operation, SyncPayload, WireFrame};

use crate::record::KeyRecord;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncMode {
    Collaborative,
    Realtime,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplyEffect {
    Applied {
        key: String,
        value: Option<Vec<u8>>,
        was_new: bool,
    },
    Dominated,
}

pub struct ReplicationCore {
    mode: SyncMode,
    workspace: WorkspaceId,
    local: ParticipantId,
    records: BTreeMap<String, KeyRecord>,
    vector: VectorClock,
    pruned_floor: Heads,
}

impl ReplicationCore {
    pub fn new(workspace: WorkspaceId, local: ParticipantId, mode: SyncMode) -> Self {
        ReplicationCore {
            mode,
            workspace,
            local,
            records: BTreeMap::new(),
            vector: VectorClock::new(),
            pruned_floor: Heads::new(),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn heads(&self) -> Heads {
        self.vector.heads()
    }

    /// Writes the KeyRecord, advances the local vector, and produces a
    /// serialized Op frame ready to hand to the transport or the queue.
    pub fn apply_local(
        &mut self,
        key: &str,
        value: Option<Vec<u8>>,
        timestamp: nmeshed_clock::HybridTimestamp,
    ) -> Result<Vec<u8>, Error> {
        let seq = self.vector.increment(&self.local);
        let is_delete = value.is_none();
        self.records.insert(
            key.to_string(),
            KeyRecord {
                value: value.clone(),
                last_timestamp: timestamp,
                last_writer: self.local.clone(),
                last_seq: seq,
            },
        );
        let op = Operation {
            workspace: self.workspace,
            key: key.to_string(),
            value,
            timestamp,
            writer: self.local.clone(),
            sequence: seq,
            is_delete,
        };
        op.to_bytes()
    }

    fn op_dominates(&self, op: &Operation, existing: Option<&KeyRecord>) -> bool {
        let Some(existing) = existing else {
            return !nmeshed_clock::is_dominated_by_horizon(&self.pruned_floor, &op.writer, op.sequence);
        };
        match self.mode {
            SyncMode::Collaborative => {
                let op_key = (op.timestamp, &op.writer);
                let rec_key = (existing.last_timestamp, &existing.last_writer);
                op_key >= rec_key
            }
            SyncMode::Realtime => {
                op.is_delete || op.timestamp.physical >= existing.last_timestamp.physical
            }
        }
    }

    /// Parses the frame; if it wins against the current record (or none
    /// exists), stores it and returns `Applied`; otherwise returns
    /// `Dominated` without mutation. Always updates the vector clock with
    /// `(writer, seq)`, win or lose, since the vector tracks what's been
    /// causally observed, not what's been materialized into state.
    pub fn apply_remote(&mut self, frame_bytes: &[u8]) -> Result<ApplyEffect, Error> {
        let frame = WireFrame::decode(frame_bytes)?;
        if frame.frame_type != FrameType::Op {
            return Err(err("apply_remote given a non-Op frame"));
        }
        let op = Operation::decode_payload(&frame.payload)?;
        self.vector.observe(&op.writer, op.sequence);

        let existing = self.records.get(&op.key);
        let was_new = existing.is_none();
        if !self.op_dominates(&op, existing) {
            return Ok(ApplyEffect::Dominated);
        }

        self.records.insert(
            op.key.clone(),
            KeyRecord {
                value: op.value.clone(),
                last_timestamp: op.timestamp,
                last_writer: op.writer.clone(),
                last_seq: op.sequence,
            },
        );
        Ok(ApplyEffect::Applied {
            key: op.key,
            value: op.value,
            was_new,
        })
    }

    /// Serializes all KeyRecords and the vector into a single sync frame;
    /// recipients use it to bootstrap.
    pub fn get_binary_snapshot(&self) -> Result<Vec<u8>, Error> {
        let mut w = nmeshed_wire::ByteWriter::new();
        w.write_u32(self.records.len() as u32);
        for (key, rec) in &self.records {
            w.write_u32_prefixed_string(key);
            w.write_array16(&rec.last_timestamp.to_wire_bytes());
            w.write_u8_prefixed_string(rec.last_writer.as_str())?;
            w.write_u64(rec.last_seq);
            match &rec.value {
                Some(v) => {
                    w.write_u8(0);
                    w.write_u32_prefixed_bytes(v);
                }
                None => {
                    w.write_u8(1);
                    w.write_u32(0);
                }
            }
        }
        let heads = self.vector.heads();
        w.write_u32(heads.len() as u32);
        for (writer, seq) in &heads {
            w.write_u8_prefixed_string(writer.as_str())?;
            w.write_u64(*seq);
        }
        let payload = SyncPayload::Snapshot(w.into_vec());
        Ok(payload.to_frame()?.encode())
    }

    /// Rehydrates a core's records and vector from a snapshot frame produced
    /// by `get_binary_snapshot` on (possibly) another participant.
    pub fn apply_binary_snapshot(&mut self, frame_bytes: &[u8]) -> Result<(), Error> {
        let frame = WireFrame::decode(frame_bytes)?;
        if frame.frame_type != FrameType::Sync {
            return Err(err("apply_binary_snapshot given a non-Sync frame"));
        }
        let payload = SyncPayload::decode_payload(&frame.payload)?;
        let SyncPayload::Snapshot(bytes) = payload else {
            return Err(err("sync frame is not a snapshot"));
        };
        let mut r = nmeshed_wire::ByteReader::new(&bytes);
        let nrecords = r.read_u32()? as usize;
        for _ in 0..nrecords {
            let key = r.read_u32_prefixed_string()?;
            let ts = nmeshed_clock::HybridTimestamp::from_wire_bytes(r.read_array16()?);
            let writer = ParticipantId::from(r.read_u8_prefixed_string()?);
            let seq = r.read_u64()?;
            let is_tombstone = r.read_u8()? != 0;
            let raw_value = r.read_u32_prefixed_bytes()?;
            let value = if is_tombstone { None } else { Some(raw_value) };

            let existing = self.records.get(&key);
            let op_key = (ts, &writer);
            let should_apply = match existing {
                None => !nmeshed_clock::is_dominated_by_horizon(&self.pruned_floor, &writer, seq),
                Some(rec) => op_key >= (rec.last_timestamp, &rec.last_writer),
            };
            self.vector.observe(&writer, seq);
            if should_apply {
                self.records.insert(
                    key,
                    KeyRecord {
                        value,
                        last_timestamp: ts,
                        last_writer: writer,
                        last_seq: seq,
                    },
                );
            }
        }
        let nheads = r.read_u32()? as usize;
        for _ in 0..nheads {
            let writer = ParticipantId::from(r.read_u8_prefixed_string()?);
            let seq = r.read_u64()?;
            self.vector.observe(&writer, seq);
        }
        Ok(())
    }

    /// Read-only view of current, non-tombstoned values.
    pub fn get_state(&self) -> BTreeMap<String, Vec<u8>> {
        self.records
            .iter()
            .filter_map(|(k, rec)| rec.value.clone().map(|v| (k.clone(), v)))
            .collect()
    }

    /// Removes tombstoned records dominated by the horizon; never removes
    /// live values. Every `(writer, seq)` pair pruned away is folded into
    /// `pruned_floor`, so a later replay of that same op (or anything
    /// older from that writer) is rejected instead of read back as new.
    pub fn prune(&mut self, horizon: &Heads) {
        for rec in self.records.values() {
            if rec.is_tombstone() && nmeshed_clock::is_dominated_by_horizon(horizon, &rec.last_writer, rec.last_seq) {
                let floor = self.pruned_floor.entry(rec.last_writer.clone()).or_insert(0);
                if rec.last_seq > *floor {
                    *floor = rec.last_seq;
                }
            }
        }
        self.records.retain(|_, rec| {
            !rec.is_tombstone()
                || !nmeshed_clock::is_dominated_by_horizon(horizon, &rec.last_writer, rec.last_seq)
        });
    }

    pub fn record(&self, key: &str) -> Option<&KeyRecord> {
        self.records.get(key)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nmeshed_clock::HybridTimestamp;
    use test_log::test;

    fn core(mode: SyncMode, local: &str) -> ReplicationCore {
        ReplicationCore::new(
            WorkspaceId::from_bytes([1; 16]),
            ParticipantId::from(local),
            mode,
        )
    }

    #[test]
    fn test_two_participant_lww() {
        let mut a = core(SyncMode::Collaborative, "A");
        let mut b = core(SyncMode::Collaborative, "B");

        let ts_a = HybridTimestamp::new(1000, 0, nmeshed_clock::node_hash(&ParticipantId::from("A")));
        let ts_b = HybridTimestamp::new(1001, 0, nmeshed_clock::node_hash(&ParticipantId::from("B")));

        let frame_a = a.apply_local("x", Some(vec![0x01]), ts_a).unwrap();
        let frame_b = b.apply_local("x", Some(vec![0x02]), ts_b).unwrap();

        a.apply_remote(&frame_b).unwrap();
        b.apply_remote(&frame_a).unwrap();

        assert_eq!(a.get_state().get("x"), Some(&vec![0x02]));
        assert_eq!(b.get_state().get("x"), Some(&vec![0x02]));
        assert_eq!(a.heads().get(&ParticipantId::from("A")), Some(&1));
        assert_eq!(a.heads().get(&ParticipantId::from("B")), Some(&1));
    }

    #[test]
    fn test_idempotent_remote_apply() {
        let mut a = core(SyncMode::Collaborative, "A");
        let mut b = core(SyncMode::Collaborative, "B");
        let ts = HybridTimestamp::new(5, 0, nmeshed_clock::node_hash(&ParticipantId::from("B")));
        let frame = b.apply_local("x", Some(vec![1]), ts).unwrap();

        a.apply_remote(&frame).unwrap();
        let state1 = a.get_state();
        a.apply_remote(&frame).unwrap();
        let state2 = a.get_state();
        assert_eq!(state1, state2);
        assert_eq!(a.heads().get(&ParticipantId::from("B")), Some(&1));
    }

    #[test]
    fn test_commutative_application_order() {
        let ts1 = HybridTimestamp::new(10, 0, 1);
        let ts2 = HybridTimestamp::new(20, 0, 2);
        let writer1 = ParticipantId::from("w1");
        let writer2 = ParticipantId::from("w2");

        let op1 = Operation {
            workspace: WorkspaceId::from_bytes([0; 16]),
            key: "x".to_string(),
            value: Some(vec![1]),
            timestamp: ts1,
            writer: writer1,
            sequence: 1,
            is_delete: false,
        };
        let op2 = Operation {
            workspace: WorkspaceId::from_bytes([0; 16]),
            key: "x".to_string(),
            value: Some(vec![2]),
            timestamp: ts2,
            writer: writer2,
            sequence: 1,
            is_delete: false,
        };

        let mut forward = core(SyncMode::Collaborative, "observer1");
        forward.apply_remote(&op1.to_bytes().unwrap()).unwrap();
        forward.apply_remote(&op2.to_bytes().unwrap()).unwrap();

        let mut backward = core(SyncMode::Collaborative, "observer2");
        backward.apply_remote(&op2.to_bytes().unwrap()).unwrap();
        backward.apply_remote(&op1.to_bytes().unwrap()).unwrap();

        assert_eq!(forward.get_state(), backward.get_state());
    }

    #[test]
    fn test_realtime_tombstone_always_accepted() {
        let mut core = core(SyncMode::Realtime, "A");
        let writer = ParticipantId::from("B");
        let op_value = Operation {
            workspace: WorkspaceId::from_bytes([0; 16]),
            key: "x".to_string(),
            value: Some(vec![1]),
            timestamp: HybridTimestamp::new(1000, 0, 1),
            writer: writer.clone(),
            sequence: 1,
            is_delete: false,
        };
        core.apply_remote(&op_value.to_bytes().unwrap()).unwrap();

        // An older-physical-timestamp tombstone still wins under realtime.
        let op_delete = Operation {
            workspace: WorkspaceId::from_bytes([0; 16]),
            key: "x".to_string(),
            value: None,
            timestamp: HybridTimestamp::new(500, 0, 1),
            writer,
            sequence: 2,
            is_delete: true,
        };
        let effect = core.apply_remote(&op_delete.to_bytes().unwrap()).unwrap();
        assert!(matches!(effect, ApplyEffect::Applied { .. }));
        assert_eq!(core.get_state().get("x"), None);
    }

    #[test]
    fn test_realtime_stale_value_dominated() {
        let mut core = core(SyncMode::Realtime, "A");
        let writer = ParticipantId::from("B");
        let newer = Operation {
            workspace: WorkspaceId::from_bytes([0; 16]),
            key: "x".to_string(),
            value: Some(vec![2]),
            timestamp: HybridTimestamp::new(2000, 0, 1),
            writer: writer.clone(),
            sequence: 2,
            is_delete: false,
        };
        core.apply_remote(&newer.to_bytes().unwrap()).unwrap();

        let stale = Operation {
            workspace: WorkspaceId::from_bytes([0; 16]),
            key: "x".to_string(),
            value: Some(vec![1]),
            timestamp: HybridTimestamp::new(1000, 0, 1),
            writer,
            sequence: 1,
            is_delete: false,
        };
        let effect = core.apply_remote(&stale.to_bytes().unwrap()).unwrap();
        assert_eq!(effect, ApplyEffect::Dominated);
        assert_eq!(core.get_state().get("x"), Some(&vec![2]));
    }

    #[test]
    fn test_prune_removes_dominated_tombstone_only() {
        let mut core = core(SyncMode::Collaborative, "A");
        let ts = HybridTimestamp::new(1, 0, 1);
        core.apply_local("live", Some(vec![1]), ts).unwrap();
        core.apply_local("dead", None, HybridTimestamp::new(2, 0, 1))
            .unwrap();

        let mut horizon = Heads::new();
        horizon.insert(ParticipantId::from("A"), 10);
        core.prune(&horizon);

        assert_eq!(core.record_count(), 1);
        assert!(core.record("dead").is_none());
        assert!(core.record("live").is_some());
    }

    #[test]
    fn test_prune_never_removes_live_values() {
        let mut core = core(SyncMode::Collaborative, "A");
        core.apply_local("live", Some(vec![1]), HybridTimestamp::new(1, 0, 1))
            .unwrap();
        let mut horizon = Heads::new();
        horizon.insert(ParticipantId::from("A"), 1000);
        core.prune(&horizon);
        assert!(core.record("live").is_some());
    }

    #[test]
    fn test_pruned_key_does_not_resurrect_on_stale_replay() {
        let mut a = core(SyncMode::Collaborative, "A");
        let del_ts = HybridTimestamp::new(100, 0, 1);
        a.apply_local("k", None, del_ts).unwrap();

        let mut horizon = Heads::new();
        horizon.insert(ParticipantId::from("A"), 1);
        a.prune(&horizon);
        assert!(a.record("k").is_none());

        let stale = Operation {
            workspace: WorkspaceId::from_bytes([1; 16]),
            key: "k".to_string(),
            value: Some(vec![9]),
            timestamp: HybridTimestamp::new(50, 0, 1),
            writer: ParticipantId::from("A"),
            sequence: 1,
            is_delete: false,
        };
        let effect = a.apply_remote(&stale.to_bytes().unwrap()).unwrap();
        assert_eq!(effect, ApplyEffect::Dominated);
        assert!(a.record("k").is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut a = core(SyncMode::Collaborative, "A");
        a.apply_local("x", Some(vec![1, 2, 3]), HybridTimestamp::new(5, 0, 1))
            .unwrap();
        a.apply_local("y", None, HybridTimestamp::new(6, 0, 1))
            .unwrap();
        let snapshot = a.get_binary_snapshot().unwrap();

        let mut b = core(SyncMode::Collaborative, "B");
        b.apply_binary_snapshot(&snapshot).unwrap();
        assert_eq!(a.get_state(), b.get_state());
        assert_eq!(a.heads(), b.heads());
    }
}
