//! Per-call operation context.

use crate::error::{AdapterError, AdapterResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation and deadline signal handed through to adapters.
///
/// The dispatcher never inspects the context; it passes it to the adapter
/// unchanged. Clones share the cancellation flag, so a scheduler can keep a
/// clone and cancel an in-flight call from another thread.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl OpContext {
    /// Creates a context without deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancels every call using this context or one of its clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true if the context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left until the deadline, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fails if the context is cancelled or past its deadline.
    ///
    /// Adapters call this before doing remote work.
    pub fn check(&self) -> AdapterResult<()> {
        if self.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(AdapterError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_passes() {
        let ctx = OpContext::new();
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let ctx = OpContext::new();
        let handle = ctx.clone();
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.check(), Err(AdapterError::Cancelled));
    }

    #[test]
    fn expired_deadline() {
        let ctx = OpContext::new().with_deadline(Instant::now());
        assert_eq!(ctx.check(), Err(AdapterError::DeadlineExceeded));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));

        let ctx = OpContext::new().with_timeout(Duration::from_secs(60));
        assert!(ctx.check().is_ok());
    }
}
