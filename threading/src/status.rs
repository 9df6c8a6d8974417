use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use value::{Record, RecordStatus};

fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i64
}

#[derive(Serialize, Clone)]
pub struct AggregateStatus {
    pub total_synced: u64,
    pub retries_pending: u64,
    pub queue_size: u64,
    pub last_sync_success: Option<i64>,
    pub last_sync_failed: Option<i64>,
    pub active_pollers: Vec<String>,
    pub started_at: i64,
}

/// Process-wide counters and per-record status (§3, §4.10). Each logical
/// field uses the narrowest synchronization it needs: atomics for scalar
/// counters, a mutex for the two small sets/maps.
pub struct StatusTracker {
    total_synced: AtomicU64,
    retries_pending: AtomicU64,
    queue_size: AtomicU64,
    last_sync_success: AtomicI64,
    last_sync_failed: AtomicI64,
    active_pollers: Mutex<HashSet<String>>,
    record_status: Mutex<HashMap<String, RecordStatus>>,
    failed_records: Mutex<HashMap<String, (String, Record)>>,
    started_at: i64,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        StatusTracker {
            total_synced: AtomicU64::new(0),
            retries_pending: AtomicU64::new(0),
            queue_size: AtomicU64::new(0),
            last_sync_success: AtomicI64::new(0),
            last_sync_failed: AtomicI64::new(0),
            active_pollers: Mutex::new(HashSet::new()),
            record_status: Mutex::new(HashMap::new()),
            failed_records: Mutex::new(HashMap::new()),
            started_at: now_millis(),
        }
    }

    pub fn set_record_status(&self, record_id: &str, status: RecordStatus) {
        self.record_status.lock().insert(record_id.to_string(), status);
        match status {
            RecordStatus::Synced => {
                self.total_synced.fetch_add(1, Ordering::Relaxed);
                self.last_sync_success.store(now_millis(), Ordering::Relaxed);
                self.failed_records.lock().remove(record_id);
            }
            RecordStatus::Failed => {
                self.last_sync_failed.store(now_millis(), Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn record_status(&self, record_id: &str) -> RecordStatus {
        self.record_status.lock().get(record_id).copied().unwrap_or_default()
    }

    /// Remembers `record` (and the destination it was headed for) so a
    /// later `POST /retry/:record_id` can resubmit it without the caller
    /// needing to resend the original payload.
    pub fn record_failure(&self, dest: &str, record: &Record) {
        self.failed_records.lock().insert(record.record_id.clone(), (dest.to_string(), record.clone()));
    }

    /// Takes back the last remembered failure for `record_id`, if any.
    pub fn take_failed(&self, record_id: &str) -> Option<(String, Record)> {
        self.failed_records.lock().remove(record_id)
    }

    pub fn incr_retries_pending(&self) {
        self.retries_pending.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decr_retries_pending(&self) {
        self.retries_pending.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn set_queue_size(&self, size: u64) {
        self.queue_size.store(size, Ordering::Relaxed);
    }

    pub fn poller_started(&self, name: &str) {
        self.active_pollers.lock().insert(name.to_string());
    }

    pub fn poller_stopped(&self, name: &str) {
        self.active_pollers.lock().remove(name);
    }

    pub fn aggregate(&self) -> AggregateStatus {
        let last_success = self.last_sync_success.load(Ordering::Relaxed);
        let last_failed = self.last_sync_failed.load(Ordering::Relaxed);
        AggregateStatus {
            total_synced: self.total_synced.load(Ordering::Relaxed),
            retries_pending: self.retries_pending.load(Ordering::Relaxed),
            queue_size: self.queue_size.load(Ordering::Relaxed),
            last_sync_success: (last_success > 0).then_some(last_success),
            last_sync_failed: (last_failed > 0).then_some(last_failed),
            active_pollers: self.active_pollers.lock().iter().cloned().collect(),
            started_at: self.started_at,
        }
    }
}
