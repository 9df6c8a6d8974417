use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-key sliding-window request admission (§4.2). All keys share one
/// mutex; the working set is bounded by `max_requests * |keys|` since
/// expired timestamps are dropped on every `allow` call.
pub struct SlidingWindowRateLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        SlidingWindowRateLimiter {
            max_requests,
            window,
            timestamps: Mutex::new(HashMap::new()),
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.timestamps.lock();
        let entry = guard.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) <= self.window);

        if entry.len() < self.max_requests {
            entry.push(now);
            true
        } else {
            false
        }
    }
}
