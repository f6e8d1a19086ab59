// Op frame payload:
// workspace(16) | key_len(u32) | key(utf8) | timestamp(16) | writer_len(u8) |
// writer | seq(u64) | is_delete(u8) | value_len(u32) | value

use nmeshed_base::{codec_err, Error, ParticipantId, WorkspaceId};
use nmeshed_clock::HybridTimestamp;

use crate::bytes_io::{ByteReader, ByteWriter};
use crate::frame::{FrameType, WireFrame};

/// A missing value with `is_delete=true` is a tombstone.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub workspace: WorkspaceId,
    pub key: String,
    pub value: Option<Vec<u8>>,
    pub timestamp: HybridTimestamp,
    pub writer: ParticipantId,
    pub sequence: u64,
    pub is_delete: bool,
}

impl Operation {
    pub fn encode_payload(&self) -> Result<Vec<u8>, Error> {
        let mut w = ByteWriter::new();
        w.write_array16(self.workspace.as_bytes());
        w.write_u32_prefixed_string(&self.key);
        w.write_array16(&self.timestamp.to_wire_bytes());
        w.write_u8_prefixed_string(self.writer.as_str())?;
        w.write_u64(self.sequence);
        w.write_u8(self.is_delete as u8);
        match &self.value {
            Some(v) => w.write_u32_prefixed_bytes(v),
            None => w.write_u32(0),
        }
        Ok(w.into_vec())
    }

    pub fn decode_payload(payload: &[u8]) -> Result<Operation, Error> {
        let mut r = ByteReader::new(payload);
        let workspace = WorkspaceId::from_bytes(r.read_array16()?);
        let key = r.read_u32_prefixed_string()?;
        let timestamp = HybridTimestamp::from_wire_bytes(r.read_array16()?);
        let writer = ParticipantId::from(r.read_u8_prefixed_string()?);
        let sequence = r.read_u64()?;
        let is_delete = r.read_u8()? != 0;
        let raw_value = r.read_u32_prefixed_bytes()?;
        if !r.is_empty() {
            return Err(codec_err("trailing bytes after op payload"));
        }
        let value = if is_delete { None } else { Some(raw_value) };
        Ok(Operation {
            workspace,
            key,
            value,
            timestamp,
            writer,
            sequence,
            is_delete,
        })
    }

    pub fn to_frame(&self) -> Result<WireFrame, Error> {
        Ok(WireFrame::new(FrameType::Op, self.encode_payload()?))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(self.to_frame()?.encode())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn sample_op(key: &str, is_delete: bool) -> Operation {
        Operation {
            workspace: WorkspaceId::from_bytes([9; 16]),
            key: key.to_string(),
            value: if is_delete {
                None
            } else {
                Some(vec![1, 2, 3])
            },
            timestamp: HybridTimestamp::new(123456, 7, 0xabcdef),
            writer: ParticipantId::from("writer-a"),
            sequence: 42,
            is_delete,
        }
    }

    #[test]
    fn test_round_trip_value_op() {
        let op = sample_op("doc:1/title", false);
        let bytes = op.encode_payload().unwrap();
        let back = Operation::decode_payload(&bytes).unwrap();
        assert_eq!(op, back);
    }

    #[test]
    fn test_round_trip_tombstone() {
        let op = sample_op("doc:1/title", true);
        let bytes = op.encode_payload().unwrap();
        let back = Operation::decode_payload(&bytes).unwrap();
        assert_eq!(back.value, None);
        assert!(back.is_delete);
        assert_eq!(op, back);
    }

    #[test]
    fn test_round_trip_arbitrary_utf8_key_and_bytes() {
        let mut op = sample_op("键/🔑/path", false);
        op.value = Some((0u8..=255).collect());
        let bytes = op.encode_payload().unwrap();
        let back = Operation::decode_payload(&bytes).unwrap();
        assert_eq!(op, back);
    }

    #[test]
    fn test_frame_round_trip() {
        let op = sample_op("k", false);
        let bytes = op.to_bytes().unwrap();
        let frame = WireFrame::decode(&bytes).unwrap();
        assert_eq!(frame.frame_type, FrameType::Op);
        let back = Operation::decode_payload(&frame.payload).unwrap();
        assert_eq!(op, back);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let op = sample_op("k", false);
        let mut bytes = op.encode_payload().unwrap();
        bytes.push(0xff);
        assert!(Operation::decode_payload(&bytes).is_err());
    }
}
