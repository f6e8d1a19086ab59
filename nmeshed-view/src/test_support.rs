use std::collections::BTreeMap;

use nmeshed_base::{EventBus, Error, SubscriptionId};

use crate::source::{OpEvent, StateSource};

/// Bare stand-in for whatever owns the keyed state, used to unit test the
/// view layer without depending on the engine crate.
#[derive(Default)]
pub struct TestSource {
    entries: BTreeMap<String, Vec<u8>>,
    ops: EventBus<OpEvent>,
}

impl TestSource {
    pub fn new() -> Self {
        TestSource::default()
    }

    /// Inserts a value without emitting an op event -- for setting up
    /// initial state before a view's construction-time scan.
    pub fn seed(&mut self, key: &str, value: Vec<u8>) {
        self.entries.insert(key.to_string(), value);
    }

    /// Applies a mutation and notifies subscribers, as the engine would on
    /// a local or remote op.
    pub fn apply(&mut self, key: &str, value: Option<Vec<u8>>) {
        match &value {
            Some(v) => {
                self.entries.insert(key.to_string(), v.clone());
            }
            None => {
                self.entries.remove(key);
            }
        }
        self.ops.emit(&OpEvent {
            key: key.to_string(),
            value,
        });
    }
}

impl StateSource for TestSource {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn scan_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn set(&mut self, key: &str, value: Option<Vec<u8>>) -> Result<(), Error> {
        self.apply(key, value);
        Ok(())
    }

    fn subscribe_ops(&mut self, listener: Box<dyn FnMut(&OpEvent)>) -> SubscriptionId {
        self.ops.subscribe(listener)
    }

    fn unsubscribe_ops(&mut self, id: SubscriptionId) {
        self.ops.unsubscribe(id);
    }
}
