// A typed event bus per component, in place of ad-hoc listener sets.
// Subscribing returns an unregister handle (`SubscriptionId`); there is no
// global emitter, each component owns its own `EventBus<T>`.

use std::collections::BTreeMap;

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct SubscriptionId(u64);

pub struct EventBus<T> {
    next_id: u64,
    subscribers: BTreeMap<u64, Box<dyn FnMut(&T)>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        EventBus {
            next_id: 0,
            subscribers: BTreeMap::new(),
        }
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.insert(id, Box::new(listener));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id.0).is_some()
    }

    pub fn emit(&mut self, event: &T) {
        for listener in self.subscribers.values_mut() {
            listener(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
