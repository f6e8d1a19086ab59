// Wire frame header: [type:u8][payload_len:u32 LE][payload].

use nmeshed_base::{codec_err, Error};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameType {
    Heartbeat = 0,
    Op = 1,
    Sync = 2,
    Presence = 3,
    Signal = 4,
    ActorRegistry = 5,
    ColumnarBatch = 6,
    Init = 7,
}

impl FrameType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => FrameType::Heartbeat,
            1 => FrameType::Op,
            2 => FrameType::Sync,
            3 => FrameType::Presence,
            4 => FrameType::Signal,
            5 => FrameType::ActorRegistry,
            6 => FrameType::ColumnarBatch,
            7 => FrameType::Init,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WireFrame {
    pub frame_type: FrameType,
    pub payload: Vec<u8>,
}

impl WireFrame {
    pub fn new(frame_type: FrameType, payload: Vec<u8>) -> Self {
        WireFrame { frame_type, payload }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.payload.len());
        out.push(self.frame_type as u8);
        out.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decodes a single frame from an exact buffer: a frame whose declared
    /// payload length doesn't match the remaining bytes, or whose type byte
    /// is unrecognized, is an error -- never a panic, never a silent partial
    /// parse.
    pub fn decode(bytes: &[u8]) -> Result<WireFrame, Error> {
        if bytes.len() < 5 {
            return Err(codec_err("frame shorter than header"));
        }
        let type_byte = bytes[0];
        let frame_type = FrameType::from_u8(type_byte)
            .ok_or_else(|| codec_err(format!("unknown frame type {type_byte}")))?;
        let payload_len = u32::from_le_bytes(bytes[1..5].try_into().unwrap()) as usize;
        let remaining = bytes.len() - 5;
        if payload_len != remaining {
            return Err(codec_err(format!(
                "declared payload length {payload_len} does not match remaining bytes {remaining}"
            )));
        }
        Ok(WireFrame {
            frame_type,
            payload: bytes[5..].to_vec(),
        })
    }
}
