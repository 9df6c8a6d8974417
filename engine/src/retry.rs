use rs_core::CrmAdapter;
use error::SyncError;
use std::sync::Arc;
use std::time::Duration;
use threading::StatusTracker;
use tracing::warn;
use value::Record;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Bounded exponential-backoff retry around a single adapter `push`
/// (§4.7). Each attempt re-runs the adapter's own `transform` so a
/// mid-retry rules update is picked up. `retries_pending` is
/// incremented on entry and decremented exactly once on exit.
pub struct RetryManager {
    status: Arc<StatusTracker>,
}

impl RetryManager {
    pub fn new(status: Arc<StatusTracker>) -> Self {
        RetryManager { status }
    }

    pub async fn push_with_retry(&self, adapter: &dyn CrmAdapter, record: &Record) -> Result<(), SyncError> {
        self.status.incr_retries_pending();
        let outcome = self.attempt(adapter, record).await;
        self.status.decr_retries_pending();
        outcome
    }

    async fn attempt(&self, adapter: &dyn CrmAdapter, record: &Record) -> Result<(), SyncError> {
        let mut delay = BACKOFF_BASE;
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            if !adapter.circuit_breaker().allow_request() {
                return Err(SyncError::admission(format!("circuit open for {}", adapter.identify())));
            }

            let transformed = adapter.transform(record);
            match adapter.push(&transformed).await {
                Ok(()) => {
                    adapter.circuit_breaker().record_success();
                    return Ok(());
                }
                Err(err) => {
                    adapter.circuit_breaker().record_failure();
                    let retryable = err.is_retryable();
                    warn!(attempt, record_id = %record.record_id, %err, "push attempt failed");
                    last_err = Some(err);
                    if !retryable || attempt == MAX_ATTEMPTS {
                        break;
                    }
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(BACKOFF_CAP);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| SyncError::TransientIo("retry exhausted with no recorded error".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Map;
    use std::sync::atomic::{AtomicU32, Ordering};
    use threading::CircuitBreaker;
    use value::Operation;

    struct FlakyAdapter {
        attempts: AtomicU32,
        fail_until: u32,
        circuit_breaker: CircuitBreaker,
        pushed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CrmAdapter for FlakyAdapter {
        fn identify(&self) -> &str {
            "flaky"
        }
        fn config_schema(&self) -> Vec<(&'static str, &'static str)> {
            vec![]
        }
        fn transform(&self, record: &Record) -> Record {
            record.clone()
        }
        async fn push(&self, record: &Record) -> Result<(), SyncError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.fail_until {
                return Err(SyncError::TransientIo("simulated transient failure".into()));
            }
            self.pushed.lock().push(record.record_id.clone());
            Ok(())
        }
        fn circuit_breaker(&self) -> &CircuitBreaker {
            &self.circuit_breaker
        }
    }

    fn record() -> Record {
        Record::new("r1", Operation::Create, Map::new(), "flaky")
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures_within_attempt_budget() {
        let adapter =
            FlakyAdapter { attempts: AtomicU32::new(0), fail_until: 2, circuit_breaker: CircuitBreaker::new(10, Duration::from_secs(30)), pushed: Mutex::new(vec![]) };
        let manager = RetryManager::new(Arc::new(StatusTracker::new()));
        manager.push_with_retry(&adapter, &record()).await.unwrap();
        assert_eq!(adapter.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(adapter.pushed.lock().len(), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_surfaces_final_error() {
        let adapter =
            FlakyAdapter { attempts: AtomicU32::new(0), fail_until: 10, circuit_breaker: CircuitBreaker::new(10, Duration::from_secs(30)), pushed: Mutex::new(vec![]) };
        let manager = RetryManager::new(Arc::new(StatusTracker::new()));
        let err = manager.push_with_retry(&adapter, &record()).await.unwrap_err();
        assert!(matches!(err, SyncError::TransientIo(_)));
        assert_eq!(adapter.attempts.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn open_circuit_is_not_retried() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(30));
        cb.record_failure();
        let adapter = FlakyAdapter { attempts: AtomicU32::new(0), fail_until: 0, circuit_breaker: cb, pushed: Mutex::new(vec![]) };
        let manager = RetryManager::new(Arc::new(StatusTracker::new()));
        let err = manager.push_with_retry(&adapter, &record()).await.unwrap_err();
        assert!(matches!(err, SyncError::AdmissionRejected(_)));
        assert_eq!(adapter.attempts.load(Ordering::SeqCst), 0);
    }
}
