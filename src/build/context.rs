//! Per-call build context.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline for one build call.
///
/// The context is checked by the pipeline before each stage and handed to the engine,
/// which decides how often to check it. Cloning shares the cancellation token.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl BuildContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Use an existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Stop the build once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop the build after `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The cancellation token, for callers that want to cancel from another thread.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel the build.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether the build should stop.
    pub fn is_done(&self) -> bool {
        self.cancellation.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_not_done() {
        assert!(!BuildContext::background().is_done());
    }

    #[test]
    fn test_cancel_through_clone() {
        let ctx = BuildContext::background();
        let handle = ctx.clone();
        handle.cancel();
        assert!(ctx.is_done());
    }

    #[test]
    fn test_external_token() {
        let token = CancellationToken::new();
        let ctx = BuildContext::background().with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.is_done());
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = BuildContext::background().with_deadline(Instant::now());
        assert!(ctx.is_done());
        let later = BuildContext::background().with_timeout(Duration::from_secs(3600));
        assert!(!later.is_done());
    }
}
