//! Debug assertion macros for the ring's structural invariants.
//!
//! Active only in debug builds; release builds compile them away. Each
//! macro states one invariant of the slot-reservation protocol and is
//! invoked at the point where the protocol could first violate it.

/// Occupancy never exceeds capacity: `head - tail <= capacity`.
///
/// Checked after a producer wins its reservation CAS.
macro_rules! debug_assert_bounded_occupancy {
    ($occupied:expr, $capacity:expr) => {
        debug_assert!(
            $occupied <= $capacity,
            "ring occupancy {} exceeds capacity {}",
            $occupied,
            $capacity
        )
    };
}

/// The consumer never claims past the producers' frontier: `tail <= head`.
///
/// Checked after a consumer wins its claim CAS.
macro_rules! debug_assert_tail_behind_head {
    ($tail:expr, $head:expr) => {
        debug_assert!(
            $tail <= $head,
            "consumer claimed sequence {} beyond producer frontier {}",
            $tail,
            $head
        )
    };
}

/// A claimed slot must have been published before it is read.
///
/// Checked before copying a slot out in `pop`.
macro_rules! debug_assert_slot_published {
    ($state:expr, $written:expr, $seq:expr) => {
        debug_assert!(
            $state == $written,
            "slot for sequence {} claimed while unpublished (state {})",
            $seq,
            $state
        )
    };
}

pub(crate) use debug_assert_bounded_occupancy;
pub(crate) use debug_assert_slot_published;
pub(crate) use debug_assert_tail_behind_head;
