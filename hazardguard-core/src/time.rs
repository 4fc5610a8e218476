//! Monotonic time for edge nodes
//!
//! Every node measures time with a free-running millisecond counter that
//! starts at boot and wraps when it overflows its fixed width. Nothing in the
//! crate subtracts two raw timestamps: all interval arithmetic goes through
//! [`ticks_diff`], [`ticks_add`] and [`elapsed_ms`], which are correct across
//! the wrap as long as the two instants are less than 2^31 ms (~24 days) apart.
//!
//! ```text
//!   u32::MAX - 5          wrap            4
//!  ────────●──────────────┼───────────────●────▶
//!          start                          end
//!  ticks_diff(end, start) = 10
//! ```
//!
//! Time sources:
//! - [`MonotonicClock`]: `std::time::Instant` backed (std only)
//! - [`ManualClock`]: settable clock for tests and simulation

use core::cell::Cell;

use crate::traits::TimeSource;

/// Device-local monotonic milliseconds (wraps at 2^32)
pub type Timestamp = u32;

/// Signed wrapping difference `end - start` in milliseconds
///
/// Negative when `end` lies before `start`.
#[inline]
pub const fn ticks_diff(end: Timestamp, start: Timestamp) -> i32 {
    end.wrapping_sub(start) as i32
}

/// Timestamp `delta` milliseconds after `base`
#[inline]
pub const fn ticks_add(base: Timestamp, delta: u32) -> Timestamp {
    base.wrapping_add(delta)
}

/// Milliseconds elapsed from `since` to `now`, zero if `since` is in the future
#[inline]
pub const fn elapsed_ms(now: Timestamp, since: Timestamp) -> u32 {
    let diff = ticks_diff(now, since);
    if diff < 0 {
        0
    } else {
        diff as u32
    }
}

/// Monotonic clock backed by `std::time::Instant`
///
/// The counter is truncated to 32 bits, so it wraps exactly like a
/// microcontroller tick counter. `with_offset` starts the counter at an
/// arbitrary value, which is handy for exercising the wrap on a host.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: std::time::Instant,
    offset: Timestamp,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    pub fn with_offset(offset: Timestamp) -> Self {
        Self {
            origin: std::time::Instant::now(),
            offset,
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        let millis = self.origin.elapsed().as_millis() as u64;
        ticks_add(self.offset, millis as u32)
    }
}

/// Manually driven clock for tests and simulation
///
/// Interior mutability lets the same clock be shared by reference with every
/// component of a simulated node while the test advances it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Cell<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.now.set(timestamp);
    }

    pub fn advance(&self, ms: u32) -> Timestamp {
        let next = ticks_add(self.now.get(), ms);
        self.now.set(next);
        next
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1000);
        assert_eq!(clock.now(), 1000);

        clock.advance(500);
        assert_eq!(clock.now(), 1500);
    }

    #[test]
    fn diff_across_wraparound() {
        let start = u32::MAX - 5;
        let end = ticks_add(start, 10);

        assert_eq!(end, 4);
        assert_eq!(ticks_diff(end, start), 10);
        assert_eq!(ticks_diff(start, end), -10);
        assert_eq!(elapsed_ms(end, start), 10);
    }

    #[test]
    fn elapsed_clamps_future_instants() {
        assert_eq!(elapsed_ms(100, 250), 0);
        assert_eq!(elapsed_ms(250, 100), 150);
    }

    #[test]
    fn manual_clock_wraps() {
        let clock = ManualClock::new(u32::MAX);
        assert_eq!(clock.advance(1), 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn monotonic_clock_honours_offset() {
        let clock = MonotonicClock::with_offset(u32::MAX - 1_000);
        let first = clock.now();
        assert!(elapsed_ms(clock.now(), first) < 1_000);
    }
}
