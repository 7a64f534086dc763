//! relay-ring - Lock-Free Slot-Reservation Ring Buffer
//!
//! The bounded queue at the heart of the relay's concurrency substrate.
//! Any number of producer threads reserve slots by winning a CAS on a
//! monotonically increasing `head` counter; a per-slot state byte hands
//! each slot from its producer to the consumer without exposing torn
//! values. The consumer side claims slots the same way on `tail`, which
//! keeps an occasional second consumer (the log pipeline's overflow purge
//! runs on producer threads) from double-reading a slot.
//!
//! # Key properties
//!
//! - `push` and `pop` never block; a full ring fails fast
//! - FIFO in reservation order; the consumer never skips an unpublished slot
//! - Unbounded `u64` sequence counters, so wrapped indices cannot alias
//! - 128-byte padding on the hot counters to avoid false sharing
//!
//! # Example
//!
//! ```
//! use relay_ring::Ring;
//!
//! let ring = Ring::<u64>::with_capacity(8);
//! assert!(ring.push(42));
//! assert_eq!(ring.pop(), Some(42));
//! assert_eq!(ring.pop(), None);
//! ```

mod invariants;
mod ring;

// Re-exported so mailbox-style consumers can pair their try-loops with
// the same backoff the ring's CAS loops use.
pub use crossbeam_utils::Backoff;
pub use ring::Ring;
