use tokio_util::sync::CancellationToken;

/// Process-wide shutdown signal. Every poller and long-running task holds
/// a clone and checks `is_shutting_down` at its next interval boundary
/// rather than being killed mid-iteration.
#[derive(Clone, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Context { token: CancellationToken::new() }
    }

    pub fn child(&self) -> Context {
        Context { token: self.token.child_token() }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Resolves once `shutdown` has been called; used to race against an
    /// interval sleep so a poller wakes immediately on shutdown instead of
    /// waiting out its full interval.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn child_is_cancelled_with_parent() {
        let parent = Context::new();
        let child = parent.child();
        assert!(!child.is_shutting_down());
        parent.shutdown();
        assert!(child.is_shutting_down());
    }
}
