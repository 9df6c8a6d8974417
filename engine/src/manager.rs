use crate::destinations::DestinationStore;
use crate::retry::RetryManager;
use rs_core::RulesEngine;
use error::SyncError;
use std::sync::Arc;
use threading::QueueManager;
use threading::StatusTracker;
use tracing::{error, info};
use value::{Record, RecordStatus};

const DEFAULT_BATCH_SIZE: usize = 50;

/// The command-driven sync path (§4.10): `enqueue_sync` admits a record
/// through rules and the queue's rate limiter, then `try_flush` drains a
/// batch and pushes each record through its destination's `RetryManager`.
pub struct SyncManager {
    destinations: Arc<DestinationStore>,
    rules: Arc<RulesEngine>,
    queue: Arc<QueueManager>,
    status: Arc<StatusTracker>,
    retry: RetryManager,
}

impl SyncManager {
    pub fn new(destinations: Arc<DestinationStore>, rules: Arc<RulesEngine>, queue: Arc<QueueManager>, status: Arc<StatusTracker>) -> Self {
        let retry = RetryManager::new(status.clone());
        SyncManager { destinations, rules, queue, status, retry }
    }

    /// §4.10 step 1-4: reject unknown destinations and rule-skipped
    /// records before ever touching the queue; a rate-limit rejection at
    /// `queue.enqueue` is a silent drop per the redesign note in
    /// SPEC_FULL.md §9, not a status update.
    pub fn enqueue_sync(&self, dest: &str, record: Record) -> Result<(), SyncError> {
        if self.destinations.get(dest).is_none() {
            return Err(SyncError::config(format!("unsupported destination '{dest}'")));
        }

        if !self.rules.should_sync(dest, &record) {
            self.status.set_record_status(&record.record_id, RecordStatus::SkippedByRule);
            return Ok(());
        }

        let record_id = record.record_id.clone();
        if self.queue.enqueue(dest, record) {
            self.status.set_record_status(&record_id, RecordStatus::Queued);
            self.status.set_queue_size(self.queue.len(dest) as u64);
        }
        Ok(())
    }

    /// §4.10: drains up to the destination's configured batch size (or
    /// `DEFAULT_BATCH_SIZE`) and pushes each record through its adapter's
    /// `RetryManager`. One record's failure never aborts the rest of the
    /// batch.
    pub async fn try_flush(&self, dest: &str) -> Result<usize, SyncError> {
        let batch_size = self.destinations.batch_size(dest, DEFAULT_BATCH_SIZE);
        let batch = self.queue.flush(dest, batch_size);
        if batch.is_empty() {
            return Ok(0);
        }

        let adapter = self
            .destinations
            .get(dest)
            .ok_or_else(|| SyncError::config(format!("unsupported destination '{dest}'")))?;

        let mut flushed = 0;
        for record in &batch {
            match self.retry.push_with_retry(adapter.as_ref(), record).await {
                Ok(()) => {
                    self.status.set_record_status(&record.record_id, RecordStatus::Synced);
                    flushed += 1;
                }
                Err(err) => {
                    error!(dest, record_id = %record.record_id, %err, "flush push failed");
                    self.status.set_record_status(&record.record_id, RecordStatus::Failed);
                    self.status.record_failure(dest, record);
                }
            }
        }
        self.status.set_queue_size(self.queue.len(dest) as u64);
        info!(dest, flushed, "flushed destination queue");
        Ok(flushed)
    }
}
