// Per-key authority tracking. The engine consults
// `is_authority(key)` to decide whether to optimistically accept remote
// snapshots or request arbitration; authority never gates writes.

use std::collections::BTreeMap;

use nmeshed_base::{EventBus, ParticipantId, SubscriptionId};

use crate::ring::ConsistentHashRing;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthorityEvent {
    BecomeAuthority(String),
    LoseAuthority(String),
}

pub struct AuthorityManager {
    local: ParticipantId,
    // key -> is local currently the authority for it
    watched: BTreeMap<String, bool>,
    events: EventBus<AuthorityEvent>,
}

impl AuthorityManager {
    pub fn new(local: ParticipantId) -> Self {
        AuthorityManager {
            local,
            watched: BTreeMap::new(),
            events: EventBus::new(),
        }
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&AuthorityEvent) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn watch(&mut self, key: impl Into<String>) {
        self.watched.entry(key.into()).or_insert(false);
    }

    pub fn unwatch(&mut self, key: &str) {
        self.watched.remove(key);
    }

    pub fn is_authority(&self, key: &str) -> bool {
        *self.watched.get(key).unwrap_or(&false)
    }

    /// Re-evaluates ownership of every watched key against the given ring
    /// and fires become/lose events for any that flipped. No watched keys
    /// means no events, ever.
    pub fn on_ring_change(&mut self, ring: &ConsistentHashRing) {
        let mut fired = Vec::new();
        for (key, was_authority) in self.watched.iter_mut() {
            let is_authority = ring.owner(key).as_ref() == Some(&self.local);
            if is_authority && !*was_authority {
                fired.push(AuthorityEvent::BecomeAuthority(key.clone()));
            } else if !is_authority && *was_authority {
                fired.push(AuthorityEvent::LoseAuthority(key.clone()));
            }
            *was_authority = is_authority;
        }
        for event in &fired {
            self.events.emit(event);
        }
    }
}
