mod authority;
mod ring;

pub use authority::{AuthorityEvent, AuthorityManager};
pub use ring::{hash_key, ConsistentHashRing, DEFAULT_VIRTUAL_NODES};
