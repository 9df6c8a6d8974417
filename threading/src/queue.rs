use crate::rate_limiter::SlidingWindowRateLimiter;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use value::Record;

struct Queue {
    pending: VecDeque<Record>,
    enqueued: u64,
    last_flush: Option<Instant>,
}

impl Queue {
    fn new() -> Self {
        Queue { pending: VecDeque::new(), enqueued: 0, last_flush: None }
    }
}

/// Per-destination bounded FIFO with batched drain (§4.3). Rate limiting
/// is applied here, at enqueue, and nowhere else in the sync plane -- see
/// the redesign note in SPEC_FULL.md §9 on avoiding double-counted
/// admissions.
pub struct QueueManager {
    queues: Mutex<HashMap<String, Queue>>,
    limiter: Arc<SlidingWindowRateLimiter>,
}

impl QueueManager {
    pub fn new(limiter: Arc<SlidingWindowRateLimiter>) -> Self {
        QueueManager { queues: Mutex::new(HashMap::new()), limiter }
    }

    /// Admits `record` into `dest`'s queue unless the rate limiter rejects
    /// it, in which case the record is silently dropped (per §4.10, the
    /// caller must reissue). Returns whether the record was admitted.
    pub fn enqueue(&self, dest: &str, record: Record) -> bool {
        if !self.limiter.allow(dest) {
            return false;
        }
        let mut queues = self.queues.lock();
        let queue = queues.entry(dest.to_string()).or_insert_with(Queue::new);
        queue.pending.push_back(record);
        queue.enqueued += 1;
        true
    }

    /// Drains up to `batch_size` records from `dest` in FIFO order. The
    /// reference implementation's drain loop never entered because it was
    /// guarded by `while len(batch) and len(batch) < batch_size`; this is
    /// the fixed contract per SPEC_FULL.md §9.
    pub fn flush(&self, dest: &str, batch_size: usize) -> Vec<Record> {
        let mut queues = self.queues.lock();
        let Some(queue) = queues.get_mut(dest) else {
            return Vec::new();
        };
        let mut batch = Vec::with_capacity(batch_size.min(queue.pending.len()));
        while batch.len() < batch_size {
            match queue.pending.pop_front() {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        queue.last_flush = Some(Instant::now());
        batch
    }

    pub fn get_pending(&self, dest: &str) -> Vec<Record> {
        self.queues
            .lock()
            .get(dest)
            .map(|q| q.pending.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, dest: &str) -> usize {
        self.queues.lock().get(dest).map(|q| q.pending.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::time::Duration;
    use value::Operation;

    fn record(id: &str) -> Record {
        Record::new(id, Operation::Create, Map::new(), "salesforce")
    }

    fn manager() -> QueueManager {
        QueueManager::new(Arc::new(SlidingWindowRateLimiter::new(100, Duration::from_secs(60))))
    }

    #[test]
    fn flush_drains_up_to_batch_size_in_fifo_order() {
        let qm = manager();
        for id in ["a", "b", "c"] {
            assert!(qm.enqueue("sf", record(id)));
        }

        let batch = qm.flush("sf", 2);
        assert_eq!(batch.iter().map(|r| r.record_id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(qm.len("sf"), 1);

        let rest = qm.flush("sf", 10);
        assert_eq!(rest.iter().map(|r| r.record_id.as_str()).collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn flush_on_unknown_destination_is_empty() {
        let qm = manager();
        assert!(qm.flush("ghost", 5).is_empty());
    }

    #[test]
    fn destinations_are_independent_queues() {
        let qm = manager();
        qm.enqueue("sf", record("a"));
        qm.enqueue("hubspot", record("b"));
        assert_eq!(qm.len("sf"), 1);
        assert_eq!(qm.len("hubspot"), 1);
    }

    #[test]
    fn rate_limited_enqueue_is_dropped_silently() {
        let qm = QueueManager::new(Arc::new(SlidingWindowRateLimiter::new(1, Duration::from_secs(60))));
        assert!(qm.enqueue("sf", record("a")));
        assert!(!qm.enqueue("sf", record("b")));
        assert_eq!(qm.len("sf"), 1);
    }
}
