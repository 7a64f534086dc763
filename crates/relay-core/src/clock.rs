//! Monotonic timestamps with a wall-clock anchor.
//!
//! Producers stamp records with an opaque monotonic counter; calendar
//! rendering happens once, at the sink, by adding the counter to the
//! wall-clock anchor captured when the clock was built. Timestamps taken
//! on one thread never decrease; across threads only the monotonic clock's
//! global order applies.

use std::str::FromStr;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Opaque monotonic timestamp: nanoseconds since the owning [`Clock`]'s
/// origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Raw nanosecond counter value.
    #[inline]
    pub fn as_nanos(self) -> u64 {
        self.0
    }
}

/// Calendar time produced by [`Clock::to_wall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub seconds_since_epoch: u64,
    pub nanoseconds: u32,
}

/// Process-wide timestamp source.
///
/// `now()` is wait-free apart from the underlying `clock_gettime`; the
/// wall-clock anchor is read once at construction so later conversions
/// never consult the (non-monotonic) system clock again.
#[derive(Debug, Clone)]
pub struct Clock {
    origin: Instant,
    /// Wall-clock reading taken at `origin`, split into (secs, subsec ns).
    anchor_secs: u64,
    anchor_nanos: u32,
}

impl Clock {
    pub fn new() -> Self {
        let origin = Instant::now();
        let anchor = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            origin,
            anchor_secs: anchor.as_secs(),
            anchor_nanos: anchor.subsec_nanos(),
        }
    }

    /// Returns the current monotonic timestamp.
    #[inline]
    pub fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed().as_nanos() as u64)
    }

    /// Converts a timestamp taken from this clock into calendar time.
    pub fn to_wall(&self, ts: Timestamp) -> WallTime {
        let total_nanos = u64::from(self.anchor_nanos) + ts.0 % 1_000_000_000;
        WallTime {
            seconds_since_epoch: self.anchor_secs + ts.0 / 1_000_000_000 + total_nanos / 1_000_000_000,
            nanoseconds: (total_nanos % 1_000_000_000) as u32,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Sub-second precision used when rendering timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    Nanosecond,
    Microsecond,
    #[default]
    Millisecond,
    Centisecond,
    Decisecond,
    Second,
}

impl Granularity {
    /// Number of fractional digits rendered after the seconds field.
    #[inline]
    pub fn digits(self) -> usize {
        match self {
            Self::Nanosecond => 9,
            Self::Microsecond => 6,
            Self::Millisecond => 3,
            Self::Centisecond => 2,
            Self::Decisecond => 1,
            Self::Second => 0,
        }
    }
}

impl FromStr for Granularity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nanosecond" => Ok(Self::Nanosecond),
            "microsecond" => Ok(Self::Microsecond),
            "millisecond" => Ok(Self::Millisecond),
            "centisecond" => Ok(Self::Centisecond),
            "decisecond" => Ok(Self::Decisecond),
            "second" => Ok(Self::Second),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_non_decreasing() {
        let clock = Clock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next >= prev);
            prev = next;
        }
    }

    #[test]
    fn wall_conversion_tracks_anchor() {
        let clock = Clock::new();
        let ts = clock.now();
        let wall = clock.to_wall(ts);
        assert!(wall.seconds_since_epoch >= clock.anchor_secs);
        assert!(wall.nanoseconds < 1_000_000_000);
    }

    #[test]
    fn granularity_parses_all_names() {
        for (name, digits) in [
            ("nanosecond", 9),
            ("microsecond", 6),
            ("millisecond", 3),
            ("centisecond", 2),
            ("decisecond", 1),
            ("second", 0),
        ] {
            assert_eq!(name.parse::<Granularity>().unwrap().digits(), digits);
        }
        assert!("fortnight".parse::<Granularity>().is_err());
    }
}
