// The interface a view needs of whatever owns the keyed state. Kept
// independent of any particular engine type so views can be unit tested
// against a bare stand-in and the engine crate can depend on this one
// without a cycle back.

use nmeshed_base::{Error, SubscriptionId};

#[derive(Clone, Debug, PartialEq)]
pub struct OpEvent {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

pub trait StateSource {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn scan_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)>;
    fn set(&mut self, key: &str, value: Option<Vec<u8>>) -> Result<(), Error>;
    fn subscribe_ops(&mut self, listener: Box<dyn FnMut(&OpEvent)>) -> SubscriptionId;
    fn unsubscribe_ops(&mut self, id: SubscriptionId);
}
