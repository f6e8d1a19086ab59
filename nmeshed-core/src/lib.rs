mod record;
mod replication;

pub use record::KeyRecord;
pub use replication::{ApplyEffect, ReplicationCore, SyncMode};
