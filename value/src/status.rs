use serde::{Deserialize, Serialize};

/// Observable state of a single record, per the §3/§4.10 state machine:
/// `unknown -> queued -> synced`, `unknown -> skipped_by_rule`, or
/// `unknown -> queued -> failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Unknown,
    Queued,
    Synced,
    SkippedByRule,
    Failed,
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Unknown
    }
}
