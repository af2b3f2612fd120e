//! Counting semaphore with close and cancellation support.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::core::{Cancellation, Interrupted};

/// How long a waiter sleeps before re-checking its cancellation token.
const POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AcquireError {
    Closed,
    Interrupted(Interrupted),
}

#[derive(Debug)]
struct State {
    permits: usize,
    closed: bool,
}

#[derive(Debug)]
pub(super) struct Semaphore {
    state: Mutex<State>,
    available: Condvar,
}

impl Semaphore {
    pub(super) fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(State {
                permits,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Block until a permit is free, the semaphore closes, or `cancel` fires.
    pub(super) fn acquire(&self, cancel: &Cancellation) -> Result<(), AcquireError> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(AcquireError::Closed);
            }
            if state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            cancel.check().map_err(AcquireError::Interrupted)?;

            let wait = cancel.remaining().map_or(POLL, |r| r.min(POLL));
            self.available.wait_for(&mut state, wait);
        }
    }

    pub(super) fn release(&self) {
        let mut state = self.state.lock();
        state.permits += 1;
        drop(state);
        self.available.notify_one();
    }

    /// Fail all current and future waiters.
    pub(super) fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    #[cfg(test)]
    pub(super) fn available(&self) -> usize {
        self.state.lock().permits
    }
}
