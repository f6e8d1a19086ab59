// Single parsing gateway. Classifies frames into a tagged
// union. Never mutates state; all side-effects happen in the engine
// dispatcher. On any decode failure returns `None`, not an exception.

use nmeshed_base::Error;

use crate::columnar::{ActorRegistry, ColumnarBatch};
use crate::frame::{FrameType, WireFrame};
use crate::op::Operation;
use crate::presence::PresenceMsg;
use crate::sync::SyncPayload;

#[derive(Clone, Debug, PartialEq)]
pub enum ParsedMessage {
    Op(Operation),
    Sync(SyncPayload),
    Init(serde_json::Value),
    Signal(Vec<u8>),
    Presence(PresenceMsg),
    ActorRegistry(ActorRegistry),
    /// A columnar batch, resolved against the actor registry the router was
    /// given (see `MessageRouter::parse_with_registry`).
    ColumnarBatch(ColumnarBatch),
    Heartbeat,
    Unknown,
}

#[derive(Default)]
pub struct MessageRouter;

impl MessageRouter {
    pub fn new() -> Self {
        MessageRouter
    }

    /// Parses a single frame's worth of bytes. Returns `None` on any decode
    /// failure (bad header, unknown type, malformed payload) rather than
    /// propagating an error -- the router never throws.
    pub fn parse(&self, bytes: &[u8]) -> Option<ParsedMessage> {
        self.parse_with_registry(bytes, None)
    }

    /// Same as `parse`, but resolves a ColumnarBatch frame against a
    /// previously-received ActorRegistry. Callers that see a ColumnarBatch
    /// frame without having parsed a preceding ActorRegistry frame should
    /// treat it as undecodable (`None`) per the ordering contract the sender and receiver agree on.
    pub fn parse_with_registry(
        &self,
        bytes: &[u8],
        registry: Option<&ActorRegistry>,
    ) -> Option<ParsedMessage> {
        self.try_parse(bytes, registry).ok()
    }

    fn try_parse(
        &self,
        bytes: &[u8],
        registry: Option<&ActorRegistry>,
    ) -> Result<ParsedMessage, Error> {
        let frame = WireFrame::decode(bytes)?;
        Ok(match frame.frame_type {
            FrameType::Heartbeat => ParsedMessage::Heartbeat,
            FrameType::Op => ParsedMessage::Op(Operation::decode_payload(&frame.payload)?),
            FrameType::Sync => ParsedMessage::Sync(SyncPayload::decode_payload(&frame.payload)?),
            FrameType::Presence => {
                ParsedMessage::Presence(PresenceMsg::decode_payload(&frame.payload)?)
            }
            FrameType::Signal => ParsedMessage::Signal(frame.payload),
            FrameType::Init => {
                let value: serde_json::Value = serde_json::from_slice(&frame.payload)
                    .map_err(|e| nmeshed_base::codec_err(format!("invalid init json: {e}")))?;
                ParsedMessage::Init(value)
            }
            FrameType::ActorRegistry => {
                ParsedMessage::ActorRegistry(ActorRegistry::decode_payload(&frame.payload)?)
            }
            FrameType::ColumnarBatch => {
                let registry = registry
                    .ok_or_else(|| nmeshed_base::codec_err("columnar batch without registry"))?;
                ParsedMessage::ColumnarBatch(ColumnarBatch::decode_payload(
                    &frame.payload,
                    registry,
                )?)
            }
        })
    }
}
