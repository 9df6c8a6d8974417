use async_trait::async_trait;
use error::SyncError;
use threading::CircuitBreaker;
use value::Record;

/// §4.6: a Source yields records, either in bulk or as a delta since its
/// last call. Adapters that only support one direction return
/// `SyncError::Unsupported` from the other -- the default here.
#[async_trait]
pub trait Source: Send + Sync {
    fn identify(&self) -> &str;

    async fn fetch_records(&self) -> Result<Vec<Record>, SyncError> {
        Err(SyncError::unsupported(format!("{} does not support fetch_records", self.identify())))
    }

    async fn fetch_new_records(&self) -> Result<Vec<Record>, SyncError> {
        Err(SyncError::unsupported(format!("{} does not support fetch_new_records", self.identify())))
    }
}

/// §4.6: a Sink persists or forwards records, deduplicating on
/// `record_id` unless `allow_duplicates` is set.
#[async_trait]
pub trait Sink: Send + Sync {
    fn identify(&self) -> &str;

    async fn write_record(&self, record: &Record, allow_duplicates: bool) -> Result<(), SyncError>;
}

/// §4.5: the capability set every CRM adapter exposes. Each adapter owns
/// its own `CircuitBreaker`, consulted by `SyncManager`/`RetryManager`
/// before every `push`.
#[async_trait]
pub trait CrmAdapter: Send + Sync {
    fn identify(&self) -> &str;

    /// Expected config key -> human description, used both to document
    /// the destination and to validate a topology block at load time.
    fn config_schema(&self) -> Vec<(&'static str, &'static str)>;

    /// Adapter-specific field renaming, distinct from the rules engine's
    /// `transform` -- this is the shape the remote API expects.
    fn transform(&self, record: &Record) -> Record;

    async fn push(&self, record: &Record) -> Result<(), SyncError>;

    async fn fetch_recent_changes(&self, _since_ms: i64) -> Result<Vec<Record>, SyncError> {
        Err(SyncError::unsupported(format!("{} does not support fetch_recent_changes", self.identify())))
    }

    async fn pull(&self) -> Result<Vec<Record>, SyncError> {
        Err(SyncError::unsupported(format!("{} does not support pull", self.identify())))
    }

    fn circuit_breaker(&self) -> &CircuitBreaker;
}
