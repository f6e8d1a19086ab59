// Scoped to a key prefix. The cached `data()` array keeps stable identity
// across calls until a mutation under the prefix arrives -- invalidation is
// granular, so a write to an unrelated prefix never disturbs this
// collection's cache.

use std::cell::RefCell;
use std::rc::Rc;

use nmeshed_base::{EventBus, Error, SubscriptionId};

use crate::source::{OpEvent, StateSource};

struct Inner {
    prefix: String,
    cache: Option<Rc<Vec<(String, Vec<u8>)>>>,
    version: u64,
    change: EventBus<()>,
}

pub struct Collection<S: StateSource> {
    source: Rc<RefCell<S>>,
    inner: Rc<RefCell<Inner>>,
    sub_id: SubscriptionId,
}

impl<S: StateSource> Collection<S> {
    pub fn new(source: Rc<RefCell<S>>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let initial = source.borrow().scan_prefix(&prefix);
        let inner = Rc::new(RefCell::new(Inner {
            prefix: prefix.clone(),
            cache: Some(Rc::new(initial)),
            version: 0,
            change: EventBus::new(),
        }));

        let inner_for_cb = inner.clone();
        let sub_id = source.borrow_mut().subscribe_ops(Box::new(move |ev: &OpEvent| {
            let mut inner = inner_for_cb.borrow_mut();
            if ev.key.starts_with(&inner.prefix) {
                inner.cache = None;
                inner.version += 1;
                inner.change.emit(&());
            }
        }));

        Collection { source, inner, sub_id }
    }

    /// Cached dense array; re-scans the source only if the cache was
    /// invalidated by a matching mutation since the last call.
    pub fn data(&self) -> Rc<Vec<(String, Vec<u8>)>> {
        let needs_rescan = self.inner.borrow().cache.is_none();
        if needs_rescan {
            let prefix = self.inner.borrow().prefix.clone();
            let fresh = Rc::new(self.source.borrow().scan_prefix(&prefix));
            self.inner.borrow_mut().cache = Some(fresh);
        }
        self.inner.borrow().cache.clone().unwrap()
    }

    pub fn get(&self, id: &str) -> Option<Vec<u8>> {
        let key = format!("{}{}", self.inner.borrow().prefix, id);
        self.source.borrow().get(&key)
    }

    /// Writes `value` at `id` within this collection's prefix.
    pub fn set(&self, id: &str, value: Option<Vec<u8>>) -> Result<(), Error> {
        let key = format!("{}{}", self.inner.borrow().prefix, id);
        self.source.borrow_mut().set(&key, value)
    }

    /// Inserts a new entry at `id`. Same as `set` with a value, kept
    /// separate so callers can express intent without an `Option`.
    pub fn add(&self, id: &str, value: Vec<u8>) -> Result<(), Error> {
        self.set(id, Some(value))
    }

    pub fn delete(&self, id: &str) -> Result<(), Error> {
        self.set(id, None)
    }

    pub fn size(&self) -> usize {
        self.data().len()
    }

    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    pub fn on_change(&self, listener: impl FnMut(&()) + 'static) -> SubscriptionId {
        self.inner.borrow_mut().change.subscribe(listener)
    }

    pub fn off_change(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().change.unsubscribe(id)
    }
}

impl<S: StateSource> Drop for Collection<S> {
    fn drop(&mut self) {
        self.source.borrow_mut().unsubscribe_ops(self.sub_id);
    }
}
