// A queue entry is either a serialized wire frame (the common case, once the
// engine has a core to produce one from) or a pre-connect `{key, value}`
// pair recorded before the core exists yet. Persisted form tags each with a
// discriminant byte so rehydration can tell them apart.

use nmeshed_base::{codec_err, Error};
use nmeshed_wire::{ByteReader, ByteWriter};

#[derive(Clone, Debug, PartialEq)]
pub enum QueueEntry {
    Frame(Vec<u8>),
    PreConnect { key: String, value: Option<Vec<u8>> },
}

impl QueueEntry {
    /// The key this entry should be attributed to for backpressure eviction
    /// accounting. Frames don't carry a plain key on the wire without being
    /// fully decoded, so frame entries are attributed to an opaque marker;
    /// eviction itself only cares about FIFO order, not the key.
    pub fn eviction_tag(&self) -> &str {
        match self {
            QueueEntry::Frame(_) => "<frame>",
            QueueEntry::PreConnect { key, .. } => key,
        }
    }

    fn encode(&self, w: &mut ByteWriter) {
        match self {
            QueueEntry::Frame(bytes) => {
                w.write_u8(0);
                w.write_u32_prefixed_bytes(bytes);
            }
            QueueEntry::PreConnect { key, value } => {
                w.write_u8(1);
                w.write_u32_prefixed_string(key);
                match value {
                    Some(v) => {
                        w.write_u8(1);
                        w.write_u32_prefixed_bytes(v);
                    }
                    None => {
                        w.write_u8(0);
                        w.write_u32(0);
                    }
                }
            }
        }
    }

    fn decode(r: &mut ByteReader) -> Result<Self, Error> {
        let tag = r.read_u8()?;
        match tag {
            0 => Ok(QueueEntry::Frame(r.read_u32_prefixed_bytes()?)),
            1 => {
                let key = r.read_u32_prefixed_string()?;
                let has_value = r.read_u8()? != 0;
                let raw = r.read_u32_prefixed_bytes()?;
                let value = if has_value { Some(raw) } else { None };
                Ok(QueueEntry::PreConnect { key, value })
            }
            other => Err(codec_err(format!("unknown queue entry tag {other}"))),
        }
    }
}

pub fn encode_entries(entries: &[QueueEntry]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_u32(entries.len() as u32);
    for entry in entries {
        entry.encode(&mut w);
    }
    w.into_vec()
}

pub fn decode_entries(bytes: &[u8]) -> Result<Vec<QueueEntry>, Error> {
    let mut r = ByteReader::new(bytes);
    let n = r.read_u32()? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(QueueEntry::decode(&mut r)?);
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn test_round_trip_mixed_entries() {
        let entries = vec![
            QueueEntry::Frame(vec![1, 2, 3]),
            QueueEntry::PreConnect {
                key: "k1".to_string(),
                value: Some(vec![9, 9]),
            },
            QueueEntry::PreConnect {
                key: "k2".to_string(),
                value: None,
            },
        ];
        let bytes = encode_entries(&entries);
        let back = decode_entries(&bytes).unwrap();
        assert_eq!(entries, back);
    }

    #[test]
    fn test_empty_round_trip() {
        let bytes = encode_entries(&[]);
        assert_eq!(decode_entries(&bytes).unwrap(), vec![]);
    }
}
