mod backoff;
mod channel;
mod chaos;
mod config;
mod driver;
mod status;
mod url;

pub use backoff::{compute_backoff_ms, FixedJitter, JitterSource, RandJitter, DEFAULT_SPREAD};
pub use channel::{LoopbackChannel, RawChannel, RawEvent};
pub use chaos::{ChaosConfig, ChaosNetwork};
pub use config::TransportConfig;
pub use driver::TransportDriver;
pub use status::{TransportEvent, TransportStatus};
pub use url::build_sync_url;
