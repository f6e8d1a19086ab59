// ColumnarBatch: batch compaction of op streams, 3-10x size
// reduction over individual Op frames. A ColumnarBatch frame is always
// preceded on the wire by an ActorRegistry frame mapping actor_idx ->
// writer_id, so the batch itself only carries small integer indices instead
// of repeating writer ids per-row.
//
// Timestamps and sequences are stored as deltas against a header base.

use nmeshed_base::{codec_err, Error, ParticipantId};
use nmeshed_clock::HybridTimestamp;

use crate::bytes_io::{ByteReader, ByteWriter};
use crate::frame::{FrameType, WireFrame};

#[derive(Clone, Debug, PartialEq)]
pub struct ActorRegistry {
    pub actors: Vec<ParticipantId>,
}

impl ActorRegistry {
    pub fn index_of(&self, id: &ParticipantId) -> Option<u32> {
        self.actors.iter().position(|a| a == id).map(|i| i as u32)
    }

    pub fn encode_payload(&self) -> Result<Vec<u8>, Error> {
        let mut w = ByteWriter::new();
        w.write_u32(self.actors.len() as u32);
        for actor in &self.actors {
            w.write_u8_prefixed_string(actor.as_str())?;
        }
        Ok(w.into_vec())
    }

    pub fn decode_payload(payload: &[u8]) -> Result<ActorRegistry, Error> {
        let mut r = ByteReader::new(payload);
        let n = r.read_u32()? as usize;
        let mut actors = Vec::with_capacity(n);
        for _ in 0..n {
            actors.push(ParticipantId::from(r.read_u8_prefixed_string()?));
        }
        if !r.is_empty() {
            return Err(codec_err("trailing bytes after actor registry payload"));
        }
        Ok(ActorRegistry { actors })
    }

    pub fn to_frame(&self) -> Result<WireFrame, Error> {
        Ok(WireFrame::new(FrameType::ActorRegistry, self.encode_payload()?))
    }
}

/// One logical row of a columnar batch, already resolved against an
/// `ActorRegistry` (i.e. `writer` rather than a raw `actor_idx`).
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnarEntry {
    pub key: String,
    pub timestamp: HybridTimestamp,
    pub value: Option<Vec<u8>>,
    pub writer: ParticipantId,
    pub sequence: u64,
    pub is_delete: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnarBatch {
    pub entries: Vec<ColumnarEntry>,
}

impl ColumnarBatch {
    /// Encodes this batch's payload, given the actor registry it will be
    /// delivered alongside. Every entry's writer must already be present in
    /// `registry` -- the caller builds the registry from the batch first.
    pub fn encode_payload(&self, registry: &ActorRegistry) -> Result<Vec<u8>, Error> {
        let base_physical = self
            .entries
            .iter()
            .map(|e| e.timestamp.physical)
            .min()
            .unwrap_or(0);
        let base_seq = self.entries.iter().map(|e| e.sequence).min().unwrap_or(0);

        let mut w = ByteWriter::new();
        w.write_u64(base_physical);
        w.write_u64(base_seq);
        w.write_u32(self.entries.len() as u32);

        for e in &self.entries {
            w.write_u32_prefixed_string(&e.key);
        }
        for e in &self.entries {
            let phys_delta = e.timestamp.physical.checked_sub(base_physical).ok_or_else(
                || codec_err("timestamp physical below batch base"),
            )?;
            w.write_u32(u32::try_from(phys_delta)
                .map_err(|_| codec_err("timestamp delta too large for columnar batch"))?);
            w.write_u16(e.timestamp.logical);
        }
        for e in &self.entries {
            match &e.value {
                Some(v) => w.write_u32_prefixed_bytes(v),
                None => w.write_u32(0),
            }
        }
        for e in &self.entries {
            let idx = registry
                .index_of(&e.writer)
                .ok_or_else(|| codec_err("writer missing from actor registry"))?;
            w.write_u32(idx);
        }
        for e in &self.entries {
            let seq_delta = e.sequence.checked_sub(base_seq).ok_or_else(
                || codec_err("sequence below batch base"),
            )?;
            w.write_u32(u32::try_from(seq_delta)
                .map_err(|_| codec_err("sequence delta too large for columnar batch"))?);
        }
        for e in &self.entries {
            w.write_u8(e.is_delete as u8);
        }
        Ok(w.into_vec())
    }

    pub fn decode_payload(
        payload: &[u8],
        registry: &ActorRegistry,
    ) -> Result<ColumnarBatch, Error> {
        let mut r = ByteReader::new(payload);
        let base_physical = r.read_u64()?;
        let base_seq = r.read_u64()?;
        let n = r.read_u32()? as usize;

        let keys: Vec<String> = (0..n)
            .map(|_| r.read_u32_prefixed_string())
            .collect::<Result<_, _>>()?;
        let ts_deltas: Vec<(u32, u16)> = (0..n)
            .map(|_| Ok((r.read_u32()?, r.read_u16()?)))
            .collect::<Result<_, Error>>()?;
        let values: Vec<Vec<u8>> = (0..n)
            .map(|_| r.read_u32_prefixed_bytes())
            .collect::<Result<_, _>>()?;
        let actor_idxs: Vec<u32> = (0..n).map(|_| r.read_u32()).collect::<Result<_, _>>()?;
        let seq_deltas: Vec<u32> = (0..n).map(|_| r.read_u32()).collect::<Result<_, _>>()?;
        let is_deletes: Vec<bool> = (0..n)
            .map(|_| Ok(r.read_u8()? != 0))
            .collect::<Result<_, Error>>()?;

        if !r.is_empty() {
            return Err(codec_err("trailing bytes after columnar batch payload"));
        }

        let mut entries = Vec::with_capacity(n);
        for i in 0..n {
            let writer = registry
                .actors
                .get(actor_idxs[i] as usize)
                .cloned()
                .ok_or_else(|| codec_err("actor index out of range"))?;
            let (phys_delta, logical) = ts_deltas[i];
            let is_delete = is_deletes[i];
            entries.push(ColumnarEntry {
                key: keys[i].clone(),
                timestamp: HybridTimestamp::new(
                    base_physical + phys_delta as u64,
                    logical,
                    nmeshed_clock::node_hash(&writer),
                ),
                value: if is_delete {
                    None
                } else {
                    Some(values[i].clone())
                },
                writer,
                sequence: base_seq + seq_deltas[i] as u64,
                is_delete,
            });
        }
        Ok(ColumnarBatch { entries })
    }

    pub fn registry(&self) -> ActorRegistry {
        let mut actors = Vec::new();
        for e in &self.entries {
            if !actors.contains(&e.writer) {
                actors.push(e.writer.clone());
            }
        }
        ActorRegistry { actors }
    }

    pub fn to_frame(&self) -> Result<WireFrame, Error> {
        let registry = self.registry();
        Ok(WireFrame::new(
            FrameType::ColumnarBatch,
            self.encode_payload(&registry)?,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn entry(key: &str, phys: u64, log: u16, writer: &str, seq: u64, is_delete: bool) -> ColumnarEntry {
        ColumnarEntry {
            key: key.to_string(),
            timestamp: HybridTimestamp::new(phys, log, nmeshed_clock::node_hash(&ParticipantId::from(writer))),
            value: if is_delete { None } else { Some(vec![1, 2]) },
            writer: ParticipantId::from(writer),
            sequence: seq,
            is_delete,
        }
    }

    #[test]
    fn test_batch_round_trip() {
        let batch = ColumnarBatch {
            entries: vec![
                entry("k1", 1000, 0, "a", 1, false),
                entry("k2", 1005, 2, "b", 7, false),
                entry("k3", 1005, 3, "a", 2, true),
            ],
        };
        let registry = batch.registry();
        let payload = batch.encode_payload(&registry).unwrap();
        let back = ColumnarBatch::decode_payload(&payload, &registry).unwrap();
        assert_eq!(back, batch);
    }

    #[test]
    fn test_registry_round_trip() {
        let registry = ActorRegistry {
            actors: vec![ParticipantId::from("a"), ParticipantId::from("b")],
        };
        let bytes = registry.encode_payload().unwrap();
        assert_eq!(ActorRegistry::decode_payload(&bytes).unwrap(), registry);
    }

    #[test]
    fn test_missing_writer_in_registry_errors() {
        let batch = ColumnarBatch {
            entries: vec![entry("k1", 1000, 0, "a", 1, false)],
        };
        let empty_registry = ActorRegistry { actors: vec![] };
        assert!(batch.encode_payload(&empty_registry).is_err());
    }

    #[test]
    fn test_batch_is_smaller_than_individual_ops() {
        use crate::op::Operation;
        use nmeshed_base::WorkspaceId;

        let entries: Vec<ColumnarEntry> = (0..20)
            .map(|i| entry(&format!("key-{i}"), 1000 + i, 0, "writer-a", i, false))
            .collect();
        let batch = ColumnarBatch { entries: entries.clone() };
        let registry = batch.registry();
        let batch_bytes = batch.to_frame().unwrap().encode().len()
            + registry.to_frame().unwrap().encode().len();

        let individual_bytes: usize = entries
            .iter()
            .map(|e| {
                Operation {
                    workspace: WorkspaceId::from_bytes([0; 16]),
                    key: e.key.clone(),
                    value: e.value.clone(),
                    timestamp: e.timestamp,
                    writer: e.writer.clone(),
                    sequence: e.sequence,
                    is_delete: e.is_delete,
                }
                .to_bytes()
                .unwrap()
                .len()
            })
            .sum();

        assert!(batch_bytes < individual_bytes);
    }
}
