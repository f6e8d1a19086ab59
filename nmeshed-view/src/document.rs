// Scoped to either a single key or a fixed set of named fields (a composite
// store). Same subscription model as Collection; emits the full snapshot on
// any watched field changing.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use nmeshed_base::{EventBus, SubscriptionId};

use crate::source::{OpEvent, StateSource};

pub type DocSnapshot = BTreeMap<String, Option<Vec<u8>>>;

struct Inner {
    fields: Vec<String>,
    snapshot: DocSnapshot,
    version: u64,
    change: EventBus<DocSnapshot>,
}

pub struct Document<S: StateSource> {
    source: Rc<RefCell<S>>,
    inner: Rc<RefCell<Inner>>,
    sub_id: SubscriptionId,
}

fn scan(source: &Rc<RefCell<impl StateSource>>, fields: &[String]) -> DocSnapshot {
    fields
        .iter()
        .map(|f| (f.clone(), source.borrow().get(f)))
        .collect()
}

impl<S: StateSource> Document<S> {
    pub fn single_key(source: Rc<RefCell<S>>, key: impl Into<String>) -> Self {
        Document::new(source, vec![key.into()])
    }

    pub fn new(source: Rc<RefCell<S>>, fields: Vec<String>) -> Self {
        let snapshot = scan(&source, &fields);
        let inner = Rc::new(RefCell::new(Inner {
            fields: fields.clone(),
            snapshot,
            version: 0,
            change: EventBus::new(),
        }));

        let inner_for_cb = inner.clone();
        let source_for_cb = source.clone();
        let sub_id = source.borrow_mut().subscribe_ops(Box::new(move |ev: &OpEvent| {
            let watched = inner_for_cb.borrow().fields.iter().any(|f| f == &ev.key);
            if !watched {
                return;
            }
            let fields = inner_for_cb.borrow().fields.clone();
            let fresh = scan(&source_for_cb, &fields);
            let mut inner = inner_for_cb.borrow_mut();
            inner.snapshot = fresh.clone();
            inner.version += 1;
            inner.change.emit(&fresh);
        }));

        Document { source, inner, sub_id }
    }

    pub fn snapshot(&self) -> DocSnapshot {
        self.inner.borrow().snapshot.clone()
    }

    pub fn field(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.borrow().snapshot.get(key).cloned().flatten()
    }

    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    pub fn on_change(&self, listener: impl FnMut(&DocSnapshot) + 'static) -> SubscriptionId {
        self.inner.borrow_mut().change.subscribe(listener)
    }

    pub fn off_change(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().change.unsubscribe(id)
    }
}

impl<S: StateSource> Drop for Document<S> {
    fn drop(&mut self) {
        self.source.borrow_mut().unsubscribe_ops(self.sub_id);
    }
}
