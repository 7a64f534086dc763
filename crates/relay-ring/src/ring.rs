use crate::invariants::{
    debug_assert_bounded_occupancy, debug_assert_slot_published, debug_assert_tail_behind_head,
};
use crossbeam_utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Producers and consumers coordinate through two monotonically increasing
// u64 sequence counters plus one state byte per slot:
//
// - `head`: next slot producers will reserve. Advanced by CAS; the winner
//   owns slot `head & mask` exclusively until it publishes.
// - `tail`: next slot consumers will claim. Advanced by CAS so that the
//   log pipeline's overflow purge (which pops from producer threads) and
//   the regular consumer cannot claim the same slot twice.
// - `states[i]` ∈ {EMPTY, RESERVED, WRITTEN}: serializes the handoff of
//   slot `i` independently of the counters. A producer that has reserved
//   but not yet copied its value never exposes a torn slot, because the
//   consumer refuses to cross a slot that is not WRITTEN.
//
// Handoff protocol for one slot:
//
//   producer: state == EMPTY (Acquire)        consumer: state == WRITTEN (Acquire)
//             CAS head -> head+1 (AcqRel)               CAS tail -> tail+1 (AcqRel)
//             state = RESERVED (Relaxed)                copy value out
//             copy value in                             state = EMPTY (Release)
//             state = WRITTEN (Release)
//
// The WRITTEN store/load pair publishes the producer's copy to the
// consumer; the EMPTY store/load pair publishes the consumer's copy-out to
// the next producer that reuses the slot. The counters alone never gate a
// data access.
//
// Sequence counters are not taken modulo the capacity. With u64 sequences
// a wrap is unreachable in practice, which rules out ABA on the counters;
// the slot index is computed as `seq & mask` only at access time.
//
// Fullness is detected two ways, and both are needed: the counter
// distance `head - tail >= capacity` covers a producer that reserved a
// sequence but has not yet marked its slot RESERVED, and the slot-state
// check covers a consumer that claimed a sequence but has not yet marked
// its slot EMPTY.
//
// =============================================================================

/// Slot is free for a producer to reserve.
const EMPTY: u8 = 0;
/// A producer won the reservation CAS but has not yet published its value.
const RESERVED: u8 = 1;
/// The value is fully copied in and visible to the consumer.
const WRITTEN: u8 = 2;

/// Bounded lock-free slot-reservation ring.
///
/// Multi-producer push, consumer pop with CAS-claimed `tail`. `T` is
/// restricted to plain `Copy` values: both users of this ring (log records
/// and relay messages) are fixed-size value types with no heap behind
/// them, and copy-out then never needs drop coordination.
pub struct Ring<T> {
    /// Next sequence producers reserve. Monotonic, not modulo capacity.
    head: CachePadded<AtomicU64>,
    /// Next sequence consumers claim. Monotonic, `tail <= head` always.
    tail: CachePadded<AtomicU64>,
    /// One handoff state byte per slot.
    states: Box<[AtomicU8]>,
    /// Slot storage. A slot is initialized exactly while its state byte
    /// reads WRITTEN.
    slots: UnsafeCell<Box<[MaybeUninit<T>]>>,
    mask: usize,
}

// SAFETY: all slot accesses are gated by the per-slot state protocol above;
// a slot has exactly one writer between RESERVED and WRITTEN and exactly
// one reader between the tail claim and EMPTY.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T: Copy> Ring<T> {
    /// Creates a ring with `capacity` slots, all EMPTY.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, not a power of two, or larger than
    /// 2^20 slots (memory-safety belt for misconfigured callers).
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity <= (1 << 20),
            "ring capacity must be a power of two in 1..=2^20, got {capacity}"
        );

        let states = (0..capacity)
            .map(|_| AtomicU8::new(EMPTY))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        // Fixed-size storage as a boxed slice: the ring never grows.
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, MaybeUninit::uninit);

        Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            states,
            slots: UnsafeCell::new(slots.into_boxed_slice()),
            mask: capacity - 1,
        }
    }

    /// Returns the slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Returns the current occupancy. Racy by nature; exact only when the
    /// ring is quiescent.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        head.saturating_sub(tail) as usize
    }

    /// Returns true if no slot is occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if every slot is occupied.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Reserve a slot, copy `value` in, publish it. Never blocks.
    ///
    /// Returns `false` only when the ring is full from this producer's
    /// view; the caller decides whether to purge, retry, or drop.
    pub fn push(&self, value: T) -> bool {
        let backoff = Backoff::new();
        loop {
            let head = self.head.load(Ordering::Relaxed);
            let slot = (head as usize) & self.mask;

            // Counter-distance full check. The slot-state check below is
            // not enough on its own: a producer that reserved this slot's
            // sequence one whole lap ago but has not yet stored RESERVED
            // leaves the state EMPTY while the slot is owned.
            let tail = self.tail.load(Ordering::Acquire);
            if head.wrapping_sub(tail) as usize >= self.capacity() {
                return false;
            }

            // A non-EMPTY slot at the head position means the consumer has
            // not yet freed the slot one full lap behind: the ring is full.
            if self.states[slot].load(Ordering::Acquire) != EMPTY {
                return false;
            }

            match self.head.compare_exchange(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let tail = self.tail.load(Ordering::Relaxed);
                    debug_assert_bounded_occupancy!(
                        head.wrapping_add(1).saturating_sub(tail) as usize,
                        self.capacity()
                    );

                    // The CAS win grants exclusive ownership of `slot`
                    // until the WRITTEN store below.
                    self.states[slot].store(RESERVED, Ordering::Relaxed);
                    // SAFETY: this producer owns `slot` (reservation CAS
                    // won, state RESERVED); no other thread reads or
                    // writes it until the Release store publishes it.
                    unsafe {
                        (*self.slots.get())[slot].write(value);
                    }
                    self.states[slot].store(WRITTEN, Ordering::Release);
                    return true;
                }
                // Lost the reservation to another producer; its win means
                // the ring made progress, so just re-read and retry.
                Err(_) => backoff.spin(),
            }
        }
    }

    /// Claim and copy out the oldest published value. Never blocks.
    ///
    /// Returns `None` when the ring is empty or the slot at `tail` is
    /// reserved but not yet published; the consumer must not skip ahead,
    /// or FIFO order would break.
    pub fn pop(&self) -> Option<T> {
        let backoff = Backoff::new();
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            let slot = (tail as usize) & self.mask;

            let state = self.states[slot].load(Ordering::Acquire);
            if state != WRITTEN {
                return None;
            }

            match self.tail.compare_exchange(
                tail,
                tail.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    debug_assert_tail_behind_head!(
                        tail.wrapping_add(1),
                        self.head.load(Ordering::Relaxed)
                    );
                    // Only a tail claim can retire a WRITTEN slot, and the
                    // claim for `tail` was just won here.
                    debug_assert_slot_published!(
                        self.states[slot].load(Ordering::Relaxed),
                        WRITTEN,
                        tail
                    );

                    // SAFETY: the slot was published (WRITTEN observed with
                    // Acquire, pairing with the producer's Release) and this
                    // thread won the claim for it; nobody else touches the
                    // slot until the EMPTY store hands it back to producers.
                    let value = unsafe { (*self.slots.get())[slot].assume_init_read() };
                    self.states[slot].store(EMPTY, Ordering::Release);
                    return Some(value);
                }
                // Another claimer took this sequence; retry at the next.
                Err(_) => backoff.spin(),
            }
        }
    }

    /// Resets counters and every slot state to EMPTY.
    ///
    /// Exclusive access makes this safe without atomics; any values still
    /// in the ring are discarded (they are plain copies).
    pub fn reset(&mut self) {
        self.head = CachePadded::new(AtomicU64::new(0));
        self.tail = CachePadded::new(AtomicU64::new(0));
        for state in &*self.states {
            state.store(EMPTY, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_fifo() {
        let ring = Ring::<u64>::with_capacity(8);

        for i in 0..5 {
            assert!(ring.push(i));
        }
        assert_eq!(ring.len(), 5);

        for i in 0..5 {
            assert_eq!(ring.pop(), Some(i));
        }
        assert!(ring.is_empty());
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn full_at_capacity_boundary() {
        let ring = Ring::<u64>::with_capacity(4);

        // Capacity minus one: one more push must still succeed.
        for i in 0..3 {
            assert!(ring.push(i));
        }
        assert!(ring.push(3));
        assert!(ring.is_full());

        // And the next one must fail without side effects.
        assert!(!ring.push(4));
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.pop(), Some(0));
    }

    #[test]
    fn slots_are_reusable_across_laps() {
        let ring = Ring::<u64>::with_capacity(4);

        // Three full laps through the slot array.
        for lap in 0..3u64 {
            for i in 0..4 {
                assert!(ring.push(lap * 4 + i));
            }
            for i in 0..4 {
                assert_eq!(ring.pop(), Some(lap * 4 + i));
            }
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn interleaved_push_pop_keeps_order() {
        let ring = Ring::<u64>::with_capacity(4);

        assert!(ring.push(1));
        assert!(ring.push(2));
        assert_eq!(ring.pop(), Some(1));
        assert!(ring.push(3));
        assert!(ring.push(4));
        assert!(ring.push(5));
        assert!(ring.is_full());
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
        assert_eq!(ring.pop(), Some(4));
        assert_eq!(ring.pop(), Some(5));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn reset_restores_empty_state() {
        let mut ring = Ring::<u64>::with_capacity(4);

        for i in 0..4 {
            assert!(ring.push(i));
        }
        ring.reset();

        assert!(ring.is_empty());
        assert_eq!(ring.pop(), None);
        assert!(ring.push(99));
        assert_eq!(ring.pop(), Some(99));
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two_capacity() {
        let _ = Ring::<u64>::with_capacity(12);
    }
}
