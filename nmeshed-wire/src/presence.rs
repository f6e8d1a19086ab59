// Presence frame payload:
// workspace(16) | user_len(u32) | user | status(u8)

use nmeshed_base::{codec_err, Error, WorkspaceId};

use crate::bytes_io::{ByteReader, ByteWriter};
use crate::frame::{FrameType, WireFrame};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PresenceStatus {
    Online = 0,
    Leave = 1,
    Idle = 2,
}

impl PresenceStatus {
    fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => PresenceStatus::Online,
            1 => PresenceStatus::Leave,
            2 => PresenceStatus::Idle,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PresenceMsg {
    pub workspace: WorkspaceId,
    pub user: String,
    pub status: PresenceStatus,
}

impl PresenceMsg {
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_array16(self.workspace.as_bytes());
        w.write_u32_prefixed_string(&self.user);
        w.write_u8(self.status as u8);
        w.into_vec()
    }

    pub fn decode_payload(payload: &[u8]) -> Result<PresenceMsg, Error> {
        let mut r = ByteReader::new(payload);
        let workspace = WorkspaceId::from_bytes(r.read_array16()?);
        let user = r.read_u32_prefixed_string()?;
        let status_byte = r.read_u8()?;
        let status = PresenceStatus::from_u8(status_byte)
            .ok_or_else(|| codec_err(format!("unknown presence status {status_byte}")))?;
        if !r.is_empty() {
            return Err(codec_err("trailing bytes after presence payload"));
        }
        Ok(PresenceMsg {
            workspace,
            user,
            status,
        })
    }

    pub fn to_frame(&self) -> WireFrame {
        WireFrame::new(FrameType::Presence, self.encode_payload())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn test_presence_round_trip() {
        let p = PresenceMsg {
            workspace: WorkspaceId::from_bytes([3; 16]),
            user: "alice".to_string(),
            status: PresenceStatus::Idle,
        };
        let bytes = p.encode_payload();
        assert_eq!(PresenceMsg::decode_payload(&bytes).unwrap(), p);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let p = PresenceMsg {
            workspace: WorkspaceId::from_bytes([0; 16]),
            user: "x".to_string(),
            status: PresenceStatus::Online,
        };
        let mut bytes = p.encode_payload();
        *bytes.last_mut().unwrap() = 9;
        assert!(PresenceMsg::decode_payload(&bytes).is_err());
    }
}
