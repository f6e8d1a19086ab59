mod hlc;
mod vector;

pub use hlc::{node_hash, HybridLogicalClock, HybridTimestamp};
pub use vector::{is_dominated_by_horizon, Heads, HorizonTracker, VectorClock};
