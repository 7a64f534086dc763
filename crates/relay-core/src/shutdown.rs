//! Process-wide cooperative shutdown latch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// One-shot latched shutdown signal.
///
/// The transition false→true happens at most once per process and is
/// never reversed. Queries are wait-free; `wait` parks on a condvar so
/// the signal handler path (which calls [`signal`](Self::signal)) wakes
/// sleepers promptly instead of leaving them to their poll interval.
#[derive(Debug, Default)]
pub struct ShutdownLatch {
    signalled: AtomicBool,
    lock: Mutex<bool>,
    cond: Condvar,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latches the shutdown signal. Idempotent; there is deliberately no
    /// way to clear it.
    pub fn signal(&self) {
        self.signalled.store(true, Ordering::SeqCst);
        let mut flagged = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        *flagged = true;
        self.cond.notify_all();
    }

    /// Wait-free query of the latch.
    #[inline]
    pub fn is_signalled(&self) -> bool {
        self.signalled.load(Ordering::Acquire)
    }

    /// Blocks until the latch fires or `timeout` elapses. `None` waits
    /// indefinitely. Returns true if the latch is set on return.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        if self.is_signalled() {
            return true;
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        let mut flagged = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !*flagged {
            match deadline {
                Some(deadline) => {
                    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                        return *flagged;
                    };
                    let (guard, _) = self
                        .cond
                        .wait_timeout(flagged, remaining)
                        .unwrap_or_else(PoisonError::into_inner);
                    flagged = guard;
                }
                None => {
                    flagged = self
                        .cond
                        .wait(flagged)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        true
    }
}
