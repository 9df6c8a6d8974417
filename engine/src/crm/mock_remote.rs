use parking_lot::Mutex;
use std::collections::HashMap;
use value::Record;

/// In-process stand-in for a remote CRM, since this environment has no
/// live third-party credentials (§4.5). Each mock adapter owns one of
/// these and treats it exactly like an HTTP-backed remote: `upsert`
/// mimics a REST PUT-or-create, `since` mimics a timestamp-filtered
/// incremental query.
#[derive(Default)]
pub struct MockRemote {
    records: Mutex<HashMap<String, Record>>,
}

impl MockRemote {
    pub fn new() -> Self {
        MockRemote::default()
    }

    pub fn upsert(&self, record: Record) {
        self.records.lock().insert(record.record_id.clone(), record);
    }

    pub fn since(&self, since_ms: i64) -> Vec<Record> {
        self.records.lock().values().filter(|r| r.arrived_at >= since_ms).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
