// Bounded FIFO of pending deltas. Enqueue evicts the oldest entry once
// full; flush hands entries to the transport in order and, on the first
// transport error, stops and leaves the remainder (including the failed
// entry) at the head, preserving order for the next flush attempt.

use std::collections::VecDeque;

use nmeshed_base::{Error, WorkspaceId};
use tracing::warn;

use crate::entry::{decode_entries, encode_entries, QueueEntry};

pub fn queue_storage_key(workspace: &WorkspaceId) -> String {
    format!("nmeshed.queue.{}", workspace.to_hex())
}

pub struct OperationQueue {
    max_queue_size: usize,
    entries: VecDeque<QueueEntry>,
    drop_count: u64,
}

impl OperationQueue {
    /// `max_queue_size == 0` means unbounded.
    pub fn new(max_queue_size: usize) -> Self {
        OperationQueue {
            max_queue_size,
            entries: VecDeque::new(),
            drop_count: 0,
        }
    }

    pub fn rehydrate(max_queue_size: usize, persisted: &[u8]) -> Result<Self, Error> {
        let entries = decode_entries(persisted)?;
        Ok(OperationQueue {
            max_queue_size,
            entries: entries.into(),
            drop_count: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drop_count(&self) -> u64 {
        self.drop_count
    }

    pub fn enqueue(&mut self, entry: QueueEntry) {
        if self.max_queue_size > 0 && self.entries.len() >= self.max_queue_size {
            let evicted = self.entries.pop_front();
            self.drop_count += 1;
            warn!(
                target: "nmeshed",
                tag = evicted.as_ref().map(|e| e.eviction_tag()).unwrap_or(""),
                "queue full, dropped oldest entry"
            );
        }
        self.entries.push_back(entry);
    }

    /// Hands queued entries to `send` in FIFO order. On the first error,
    /// stops and restores the remaining entries (the failed one included)
    /// to the head of the queue, then returns the error.
    pub fn flush<F>(&mut self, mut send: F) -> Result<usize, Error>
    where
        F: FnMut(&QueueEntry) -> Result<(), Error>,
    {
        let mut sent = 0;
        while let Some(entry) = self.entries.pop_front() {
            if let Err(e) = send(&entry) {
                self.entries.push_front(entry);
                return Err(e);
            }
            sent += 1;
        }
        Ok(sent)
    }

    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_entries(&self.snapshot())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn pre(key: &str) -> QueueEntry {
        QueueEntry::PreConnect {
            key: key.to_string(),
            value: Some(vec![1]),
        }
    }

    #[test]
    fn test_fifo_eviction_with_bound() {
        let mut q = OperationQueue::new(2);
        q.enqueue(pre("k1"));
        q.enqueue(pre("k2"));
        q.enqueue(pre("k3"));

        assert_eq!(q.len(), 2);
        assert_eq!(q.drop_count(), 1);
        let snapshot = q.snapshot();
        assert_eq!(snapshot[0].eviction_tag(), "k2");
        assert_eq!(snapshot[1].eviction_tag(), "k3");
    }

    #[test]
    fn test_flush_sends_in_order() {
        let mut q = OperationQueue::new(2);
        q.enqueue(pre("k2"));
        q.enqueue(pre("k3"));

        let mut sent = Vec::new();
        let n = q
            .flush(|e| {
                sent.push(e.eviction_tag().to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(n, 2);
        assert_eq!(sent, vec!["k2".to_string(), "k3".to_string()]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_flush_stops_and_preserves_order_on_error() {
        let mut q = OperationQueue::new(0);
        q.enqueue(pre("k1"));
        q.enqueue(pre("k2"));
        q.enqueue(pre("k3"));

        let mut calls = 0;
        let result = q.flush(|_| {
            calls += 1;
            if calls == 2 {
                Err(nmeshed_base::err("transport unavailable"))
            } else {
                Ok(())
            }
        });

        assert!(result.is_err());
        assert_eq!(q.len(), 2);
        let remaining = q.snapshot();
        assert_eq!(remaining[0].eviction_tag(), "k2");
        assert_eq!(remaining[1].eviction_tag(), "k3");
    }

    #[test]
    fn test_unbounded_when_zero() {
        let mut q = OperationQueue::new(0);
        for i in 0..50 {
            q.enqueue(pre(&format!("k{i}")));
        }
        assert_eq!(q.len(), 50);
        assert_eq!(q.drop_count(), 0);
    }

    #[test]
    fn test_rehydrate_round_trip() {
        let mut q = OperationQueue::new(10);
        q.enqueue(pre("k1"));
        q.enqueue(QueueEntry::Frame(vec![1, 2, 3]));
        let bytes = q.encode();

        let back = OperationQueue::rehydrate(10, &bytes).unwrap();
        assert_eq!(back.snapshot(), q.snapshot());
    }
}
