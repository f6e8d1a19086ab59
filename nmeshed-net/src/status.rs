use nmeshed_base::{Error, ParticipantId};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportStatus {
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    Status(TransportStatus),
    Message(Vec<u8>),
    Ephemeral {
        payload: Vec<u8>,
        from: Option<ParticipantId>,
    },
    PeerJoin(ParticipantId),
    PeerLeave(ParticipantId),
    Error(String),
}

impl TransportEvent {
    pub fn error(e: &Error) -> Self {
        TransportEvent::Error(e.to_string())
    }
}
