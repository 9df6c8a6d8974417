use rs_core::{CrmAdapter, RulesEngine, Sink, Source};
use std::sync::Arc;
use std::time::Duration;
use threading::StatusTracker;
use tracing::{error, info, warn};
use util::Context;
use value::RecordStatus;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_CRM_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// The write side of a poller: either a plain `Sink` or a `CrmAdapter`
/// exposing `push` (§4.8).
pub enum PollTarget {
    Sink(Arc<dyn Sink>),
    Crm(Arc<dyn CrmAdapter>),
}

impl PollTarget {
    fn identify(&self) -> &str {
        match self {
            PollTarget::Sink(sink) => sink.identify(),
            PollTarget::Crm(crm) => crm.identify(),
        }
    }
}

/// One Poller per (source, sink) pair (§4.8). Owns a cooperative loop
/// that suspends at its interval and at adapter I/O; a single
/// iteration's failure is logged and never kills the loop.
pub struct Poller {
    pub name: String,
    source: Arc<dyn Source>,
    target: PollTarget,
    rules: Arc<RulesEngine>,
    status: Arc<StatusTracker>,
    interval: Duration,
    ctx: Context,
}

impl Poller {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn Source>,
        target: PollTarget,
        rules: Arc<RulesEngine>,
        status: Arc<StatusTracker>,
        interval: Duration,
        ctx: Context,
    ) -> Self {
        Poller { name: name.into(), source, target, rules, status, interval, ctx }
    }

    /// Runs until the context is cancelled. Registers/deregisters itself
    /// in the active-poller set at start/stop (§4.8). Takes `Arc<Self>`
    /// so `Engine` can retain a handle for manual `poll_once` triggers
    /// alongside the spawned background loop.
    pub async fn run(self: Arc<Self>) {
        self.status.poller_started(&self.name);
        info!(poller = %self.name, target = %self.target.identify(), "poller started");

        loop {
            if self.ctx.is_shutting_down() {
                break;
            }

            if let Err(err) = self.run_once().await {
                error!(poller = %self.name, %err, "poller iteration failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.ctx.cancelled() => break,
            }
        }

        self.status.poller_stopped(&self.name);
        info!(poller = %self.name, "poller stopped");
    }

    pub async fn run_once(&self) -> Result<(), error::SyncError> {
        let records = self.source.fetch_new_records().await?;
        for record in records {
            if !self.rules.matches(&record) {
                continue;
            }
            let (transformed, empty) = self.rules.transform(&record);
            if empty {
                warn!(poller = %self.name, record_id = %record.record_id, "transform produced an empty record, skipping");
                continue;
            }

            let outcome = match &self.target {
                PollTarget::Sink(sink) => sink.write_record(&transformed, false).await,
                PollTarget::Crm(crm) => crm.push(&transformed).await,
            };

            match outcome {
                Ok(()) => self.status.set_record_status(&record.record_id, RecordStatus::Synced),
                Err(err) => {
                    error!(poller = %self.name, record_id = %record.record_id, %err, "failed to deliver polled record");
                    self.status.set_record_status(&record.record_id, RecordStatus::Failed);
                }
            }
        }
        Ok(())
    }
}
