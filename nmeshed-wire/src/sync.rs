// Sync frame payload: tagged as snapshot(bytes),
// state_vector(entries) or ack_seq(u64). The snapshot bytes are opaque here
// -- nmeshed-core owns their structure; the wire layer just carries them.

use nmeshed_base::{codec_err, Error, ParticipantId};

use crate::bytes_io::{ByteReader, ByteWriter};
use crate::frame::{FrameType, WireFrame};

#[derive(Clone, Debug, PartialEq)]
pub enum SyncPayload {
    Snapshot(Vec<u8>),
    StateVector(Vec<(ParticipantId, u64)>),
    AckSeq(u64),
}

const TAG_SNAPSHOT: u8 = 0;
const TAG_STATE_VECTOR: u8 = 1;
const TAG_ACK_SEQ: u8 = 2;

impl SyncPayload {
    pub fn encode_payload(&self) -> Result<Vec<u8>, Error> {
        let mut w = ByteWriter::new();
        match self {
            SyncPayload::Snapshot(bytes) => {
                w.write_u8(TAG_SNAPSHOT);
                w.write_u32_prefixed_bytes(bytes);
            }
            SyncPayload::StateVector(entries) => {
                w.write_u8(TAG_STATE_VECTOR);
                w.write_u32(entries.len() as u32);
                for (peer, seq) in entries {
                    w.write_u8_prefixed_string(peer.as_str())?;
                    w.write_u64(*seq);
                }
            }
            SyncPayload::AckSeq(seq) => {
                w.write_u8(TAG_ACK_SEQ);
                w.write_u64(*seq);
            }
        }
        Ok(w.into_vec())
    }

    pub fn decode_payload(payload: &[u8]) -> Result<SyncPayload, Error> {
        let mut r = ByteReader::new(payload);
        let tag = r.read_u8()?;
        let result = match tag {
            TAG_SNAPSHOT => SyncPayload::Snapshot(r.read_u32_prefixed_bytes()?),
            TAG_STATE_VECTOR => {
                let n = r.read_u32()? as usize;
                let mut entries = Vec::with_capacity(n);
                for _ in 0..n {
                    let peer = ParticipantId::from(r.read_u8_prefixed_string()?);
                    let seq = r.read_u64()?;
                    entries.push((peer, seq));
                }
                SyncPayload::StateVector(entries)
            }
            TAG_ACK_SEQ => SyncPayload::AckSeq(r.read_u64()?),
            other => return Err(codec_err(format!("unknown sync tag {other}"))),
        };
        if !r.is_empty() {
            return Err(codec_err("trailing bytes after sync payload"));
        }
        Ok(result)
    }

    pub fn to_frame(&self) -> Result<WireFrame, Error> {
        Ok(WireFrame::new(FrameType::Sync, self.encode_payload()?))
    }
}
