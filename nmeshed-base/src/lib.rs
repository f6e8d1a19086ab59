mod clock;
mod error;
mod events;
mod ids;

pub use clock::{FakeClock, SystemWallClock, WallClock};
pub use error::{
    cancelled_err, codec_err, config_err, err, invalid_transition_err, kind_err, Error,
    ErrorKind, Result,
};
pub use events::{EventBus, SubscriptionId};
pub use ids::{ParticipantId, WorkspaceId};
