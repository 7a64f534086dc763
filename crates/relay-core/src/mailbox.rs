//! Per-thread bounded mailbox.
//!
//! A mailbox is the slot-reservation ring specialized to [`Message`]
//! values plus two auto-reset events that provide blocking with timeout.
//! The events are pure wakeup channels; all queue state lives in the
//! lock-free ring, so a signal race can at worst cause one extra retry
//! of a non-blocking push or pop.

use crate::error::CoreError;
use crate::event::Event;
use crate::message::Message;
use crate::shutdown::ShutdownLatch;
use relay_ring::{Backoff, Ring};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default mailbox depth in messages.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Bounded FIFO of [`Message`] values owned by one registry entry.
pub struct Mailbox {
    ring: Ring<Message>,
    owner: String,
    not_empty: Event,
    not_full: Event,
    shutdown: Arc<ShutdownLatch>,
}

impl Mailbox {
    /// Creates a mailbox for `owner` with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two (the ring's contract).
    pub fn new(owner: &str, capacity: usize, shutdown: Arc<ShutdownLatch>) -> Self {
        Self {
            ring: Ring::with_capacity(capacity),
            owner: owner.to_owned(),
            not_empty: Event::new(),
            not_full: Event::new(),
            shutdown,
        }
    }

    /// Label of the registry entry that owns this mailbox.
    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Enqueues a copy of `msg`, blocking up to `timeout` while full.
    ///
    /// A zero timeout degrades to a single attempt that fails with
    /// `QueueFull`; otherwise an exhausted deadline (or a shutdown
    /// observed on wakeup) yields `QueueTimeout`.
    pub fn push(&self, msg: &Message, timeout: Duration) -> Result<(), CoreError> {
        if self.ring.push(*msg) {
            self.not_empty.signal();
            return Ok(());
        }
        if timeout.is_zero() {
            return Err(CoreError::QueueFull);
        }

        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();
        loop {
            if self.ring.push(*msg) {
                self.not_empty.signal();
                return Ok(());
            }
            if self.shutdown.is_signalled() || Instant::now() >= deadline {
                return Err(CoreError::QueueTimeout);
            }
            // Spin briefly for a racing pop, then park on the event.
            if backoff.is_completed() {
                self.not_full.wait_deadline(deadline);
            } else {
                backoff.snooze();
            }
        }
    }

    /// Dequeues the oldest message, blocking up to `timeout` while empty.
    ///
    /// Zero timeout: single attempt, `QueueEmpty` on failure. Expired
    /// deadline or shutdown on wakeup: `QueueTimeout`.
    pub fn pop(&self, timeout: Duration) -> Result<Message, CoreError> {
        if let Some(msg) = self.ring.pop() {
            self.not_full.signal();
            return Ok(msg);
        }
        if timeout.is_zero() {
            return Err(CoreError::QueueEmpty);
        }

        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();
        loop {
            if let Some(msg) = self.ring.pop() {
                self.not_full.signal();
                return Ok(msg);
            }
            if self.shutdown.is_signalled() || Instant::now() >= deadline {
                return Err(CoreError::QueueTimeout);
            }
            if backoff.is_completed() {
                self.not_empty.wait_deadline(deadline);
            } else {
                backoff.snooze();
            }
        }
    }

    /// Discards every queued message and frees all waiting producers.
    pub fn clear(&self) {
        while self.ring.pop().is_some() {
            self.not_full.signal();
        }
        self.not_empty.clear();
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("owner", &self.owner)
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
