//! Error kinds for the concurrency substrate.

use crate::registry::ThreadState;
use thiserror::Error;

/// Errors surfaced by registry, mailbox, lifecycle and logger operations.
///
/// Ring overflow is deliberately absent: it is always recovered locally by
/// the purge policy and surfaces only as a synthetic record pair in the
/// log output.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A thread with this label is already registered.
    #[error("thread `{0}` is already registered")]
    DuplicateThread(String),

    /// No registered thread carries this label.
    #[error("no thread registered as `{0}`")]
    NoSuchThread(String),

    /// The requested state change violates the monotonic transition graph.
    #[error("invalid state transition {from:?} -> {to:?} for thread `{label}`")]
    InvalidStateTransition {
        label: String,
        from: ThreadState,
        to: ThreadState,
    },

    /// The calling thread has no installed context; it was not started
    /// through the lifecycle wrapper and never registered.
    #[error("registry context not initialized on this thread")]
    RegistryUninitialized,

    /// Mailbox is full and the caller asked for an immediate attempt.
    #[error("mailbox is full")]
    QueueFull,

    /// Mailbox is empty and the caller asked for an immediate attempt.
    #[error("mailbox is empty")]
    QueueEmpty,

    /// A bounded wait (mailbox, fan-out join) elapsed before the
    /// condition held.
    #[error("timed out waiting on queue or peer threads")]
    QueueTimeout,

    /// A worker's bounded wait for the logger thread to come up expired.
    #[error("timed out waiting for the logger thread to start")]
    LoggerTimeout,

    /// A caller-supplied value is out of contract (oversized payload,
    /// empty label, malformed key).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A fixed-capacity table is exhausted.
    #[error("capacity exhausted")]
    OutOfMemory,

    /// Sink I/O failure during logger construction or emission.
    #[error("sink i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Returns true for the two timeout kinds, which callers commonly
    /// retry or fold into their shutdown poll.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::QueueTimeout | Self::LoggerTimeout)
    }

    /// Returns true when the operation may succeed if simply retried
    /// later (transient occupancy conditions).
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::QueueFull | Self::QueueEmpty | Self::QueueTimeout)
    }
}
