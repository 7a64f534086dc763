//! Auto-reset notification event backing the mailbox's blocking waits.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Instant;

/// Condvar-backed event with auto-reset semantics: each `signal` releases
/// at most one waiter, and a successful wait consumes the signal. The
/// event provides *blocking*, never mutual exclusion; mailbox state lives
/// in the lock-free ring.
#[derive(Debug, Default)]
pub struct Event {
    signalled: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event and wakes one waiter.
    pub fn signal(&self) {
        let mut signalled = self.signalled.lock().unwrap_or_else(PoisonError::into_inner);
        *signalled = true;
        self.cond.notify_one();
    }

    /// Clears a pending signal without waking anyone.
    pub fn clear(&self) {
        let mut signalled = self.signalled.lock().unwrap_or_else(PoisonError::into_inner);
        *signalled = false;
    }

    /// Blocks until the event is signalled or `deadline` passes, consuming
    /// the signal on success. Spurious wakeups re-arm against the same
    /// deadline, so they never extend the caller's timeout budget.
    ///
    /// Returns true if a signal was consumed.
    pub fn wait_deadline(&self, deadline: Instant) -> bool {
        let mut signalled = self.signalled.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *signalled {
                *signalled = false;
                return true;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            let (guard, _) = self
                .cond
                .wait_timeout(signalled, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            signalled = guard;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn signal_before_wait_is_consumed() {
        let event = Event::new();
        event.signal();
        assert!(event.wait_deadline(Instant::now() + Duration::from_millis(1)));
        // Auto-reset: the signal is gone.
        assert!(!event.wait_deadline(Instant::now() + Duration::from_millis(1)));
    }

    #[test]
    fn wait_honours_deadline() {
        let event = Event::new();
        let started = Instant::now();
        assert!(!event.wait_deadline(started + Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn signal_wakes_blocked_waiter() {
        let event = Arc::new(Event::new());
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || event.wait_deadline(Instant::now() + Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(10));
        event.signal();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn clear_discards_pending_signal() {
        let event = Event::new();
        event.signal();
        event.clear();
        assert!(!event.wait_deadline(Instant::now() + Duration::from_millis(1)));
    }
}
