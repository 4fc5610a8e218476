//! Named-timer scheduler
//!
//! The run loop never sleeps. Every periodic job asks the scheduler whether
//! its named timer is due; the answer depends only on the monotonic clock:
//!
//! ```text
//! elapsed("logic", 200, t)   true at t=0, 200, 400, ... (at most once per 200 ms)
//! mark_override("read.co", 10_000, t)
//!                             "read.co" never fires before t + 10 000
//! ```
//!
//! Timers are created on first reference and live in a fixed-capacity map,
//! so every operation is O(1) with no allocation. All arithmetic uses the
//! wrapping helpers in [`crate::time`].

use heapless::FnvIndexMap;

use crate::constants::MAX_TIMERS;
use crate::time::{elapsed_ms, ticks_add, ticks_diff, Timestamp};

/// State of one named timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEntry {
    last_fire: Option<Timestamp>,
    interval: u32,
    override_until: Option<Timestamp>,
}

impl TimerEntry {
    const fn new() -> Self {
        Self {
            last_fire: None,
            interval: 1,
            override_until: None,
        }
    }

    /// When the timer last returned true, `None` if it never fired
    pub fn last_fire(&self) -> Option<Timestamp> {
        self.last_fire
    }

    /// Interval passed on the most recent `elapsed` call
    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn override_until(&self) -> Option<Timestamp> {
        self.override_until
    }

    fn override_remaining(&mut self, now: Timestamp) -> Option<u32> {
        let until = self.override_until?;
        let left = ticks_diff(until, now);
        if left > 0 {
            Some(left as u32)
        } else {
            self.override_until = None;
            None
        }
    }
}

/// Monotonic named-timer gate
///
/// `N` bounds the number of distinct timer names and must be a power of two.
#[derive(Debug, Clone)]
pub struct Scheduler<const N: usize = MAX_TIMERS> {
    timers: FnvIndexMap<&'static str, TimerEntry, N>,
}

impl<const N: usize> Default for Scheduler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Scheduler<N> {
    pub fn new() -> Self {
        Self {
            timers: FnvIndexMap::new(),
        }
    }

    /// True at most once per `interval` ms for `name`
    ///
    /// The first call for a name fires immediately. While an override is
    /// active the timer never fires. An interval of zero is treated as 1 ms.
    pub fn elapsed(&mut self, name: &'static str, interval: u32, now: Timestamp) -> bool {
        let interval = interval.max(1);
        let Some(entry) = self.entry_mut(name) else {
            return false;
        };
        entry.interval = interval;

        if entry.override_remaining(now).is_some() {
            return false;
        }

        let due = match entry.last_fire {
            None => true,
            Some(last) => elapsed_ms(now, last) >= interval,
        };
        if due {
            entry.last_fire = Some(now);
        }
        due
    }

    /// Suppress automatic firing of `name` for `window` ms
    ///
    /// Extends or shortens any override already in place. Returns false only
    /// when the timer table is full.
    pub fn mark_override(&mut self, name: &'static str, window: u32, now: Timestamp) -> bool {
        let Some(entry) = self.entry_mut(name) else {
            return false;
        };
        entry.override_until = Some(ticks_add(now, window));
        log_debug!(target: "hazardguard::scheduler", "override on {} for {} ms", name, window);
        true
    }

    /// End an override early; returns whether one was set
    pub fn clear_override(&mut self, name: &str) -> bool {
        match self.timers.get_mut(name) {
            Some(entry) => entry.override_until.take().is_some(),
            None => false,
        }
    }

    pub fn override_active(&mut self, name: &str, now: Timestamp) -> bool {
        self.remaining_override(name, now).is_some()
    }

    /// Milliseconds left on an active override
    pub fn remaining_override(&mut self, name: &str, now: Timestamp) -> Option<u32> {
        self.timers.get_mut(name)?.override_remaining(now)
    }

    pub fn entry(&self, name: &str) -> Option<&TimerEntry> {
        self.timers.get(name)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn entry_mut(&mut self, name: &'static str) -> Option<&mut TimerEntry> {
        if !self.timers.contains_key(name) && self.timers.insert(name, TimerEntry::new()).is_err() {
            log_warn!(
                target: "hazardguard::scheduler",
                "timer table full ({} entries), '{}' will never fire",
                N,
                name
            );
            return None;
        }
        self.timers.get_mut(name)
    }
}
