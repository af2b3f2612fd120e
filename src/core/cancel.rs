//! Cancellation and deadline context.
//!
//! Threaded through every bounded blocking point (pool acquisition, retry
//! backoff) and checked between transform steps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why an operation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Cancellation>,
}

/// Cheaply cloneable cancellation token with an optional deadline.
///
/// A child token is cancelled when its parent is, but cancelling the child
/// leaves the parent untouched.
#[derive(Debug, Clone)]
pub struct Cancellation {
    inner: Arc<Inner>,
}

impl Cancellation {
    /// Token that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// Token that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(Instant::now() + timeout), None)
    }

    /// Child token; inherits cancellation and the earlier of both deadlines.
    pub fn child(&self) -> Self {
        Self::build(self.deadline(), Some(self.clone()))
    }

    /// Child token that additionally expires after `timeout`.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        Self::build(Some(Instant::now() + timeout), Some(self.clone()))
    }

    fn build(deadline: Option<Instant>, parent: Option<Cancellation>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent,
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
            || self.inner.parent.as_ref().is_some_and(Self::is_cancelled)
    }

    pub fn deadline(&self) -> Option<Instant> {
        let parent = self.inner.parent.as_ref().and_then(Self::deadline);
        match (self.inner.deadline, parent) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Time left before the deadline (`None` = no deadline).
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail if cancelled or past the deadline.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if self.remaining().is_some_and(|r| r.is_zero()) {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    /// Sleep for `duration`, waking early on cancellation.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        const SLICE: Duration = Duration::from_millis(10);

        let until = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            std::thread::sleep(SLICE.min(until - now));
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_follows_parent() {
        let parent = Cancellation::new();
        let child = parent.child();
        assert!(child.check().is_ok());

        parent.cancel();
        assert_eq!(child.check(), Err(Interrupted::Cancelled));
    }

    #[test]
    fn test_child_cancel_does_not_touch_parent() {
        let parent = Cancellation::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_deadline_expires() {
        let token = Cancellation::with_timeout(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(token.check(), Err(Interrupted::DeadlineExceeded));
        assert_eq!(token.child().check(), Err(Interrupted::DeadlineExceeded));
    }

    #[test]
    fn test_child_with_timeout_keeps_earlier_deadline() {
        let parent = Cancellation::with_timeout(Duration::from_secs(1));
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        let short = parent.child_with_timeout(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(short.check(), Err(Interrupted::DeadlineExceeded));
        assert!(parent.check().is_ok());
    }

    #[test]
    fn test_sleep_wakes_on_cancel() {
        let token = Cancellation::new();
        let other = token.clone();
        let handle = std::thread::spawn(move || other.sleep(Duration::from_secs(10)));
        std::thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert_eq!(handle.join().unwrap(), Err(Interrupted::Cancelled));
    }
}
