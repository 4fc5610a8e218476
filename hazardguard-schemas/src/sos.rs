//! SOS button gestures
//!
//! One push button raises and clears the manual alarm:
//!
//! - hold it for [`LONG_PRESS_MS`], or
//! - click it [`RAPID_CLICKS`] times with at most [`CLICK_GAP_MS`] between clicks
//!
//! raises SOS. While SOS is active, one full click (press then release)
//! clears it. The release that ends a long press never counts as a click.

use hazardguard_core::time::{elapsed_ms, Timestamp};

pub const LONG_PRESS_MS: u32 = 5_000;
pub const RAPID_CLICKS: u8 = 5;
pub const CLICK_GAP_MS: u32 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    SosRaised,
    SosCleared,
}

#[derive(Debug, Clone, Default)]
pub struct SosDetector {
    active: bool,
    pressed: bool,
    press_started: Option<Timestamp>,
    clicks: u8,
    last_click: Option<Timestamp>,
    exit_armed: bool,
}

impl SosDetector {
    pub const fn new() -> Self {
        Self {
            active: false,
            pressed: false,
            press_started: None,
            clicks: 0,
            last_click: None,
            exit_armed: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed the sampled button level; call at least every few hundred ms
    pub fn update(&mut self, pressed: bool, now: Timestamp) -> Option<Gesture> {
        let rising = pressed && !self.pressed;
        let falling = !pressed && self.pressed;
        self.pressed = pressed;

        if self.active {
            if rising {
                self.exit_armed = true;
            } else if falling && self.exit_armed {
                *self = Self::new();
                return Some(Gesture::SosCleared);
            }
            return None;
        }

        if rising {
            self.press_started = Some(now);
            return None;
        }

        if falling {
            if self.press_started.take().is_none() {
                return None;
            }
            let in_burst = self
                .last_click
                .is_some_and(|at| elapsed_ms(now, at) <= CLICK_GAP_MS);
            self.clicks = if in_burst { self.clicks + 1 } else { 1 };
            self.last_click = Some(now);
            if self.clicks >= RAPID_CLICKS {
                return Some(self.raise());
            }
            return None;
        }

        match self.press_started {
            Some(at) if pressed && elapsed_ms(now, at) >= LONG_PRESS_MS => Some(self.raise()),
            _ => None,
        }
    }

    fn raise(&mut self) -> Gesture {
        self.active = true;
        self.press_started = None;
        self.clicks = 0;
        self.last_click = None;
        self.exit_armed = false;
        Gesture::SosRaised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(detector: &mut SosDetector, at: Timestamp) -> Option<Gesture> {
        assert_eq!(detector.update(true, at), None);
        detector.update(false, at + 100)
    }

    #[test]
    fn long_press_raises_and_release_is_ignored() {
        let mut detector = SosDetector::new();
        assert_eq!(detector.update(true, 1_000), None);
        assert_eq!(detector.update(true, 5_900), None);
        assert_eq!(detector.update(true, 6_000), Some(Gesture::SosRaised));
        assert_eq!(detector.update(false, 6_500), None);
        assert!(detector.is_active());
    }

    #[test]
    fn five_quick_clicks_raise() {
        let mut detector = SosDetector::new();
        for i in 0..4 {
            assert_eq!(click(&mut detector, i * 500), None);
        }
        assert_eq!(click(&mut detector, 2_000), Some(Gesture::SosRaised));
    }

    #[test]
    fn slow_clicks_restart_the_count() {
        let mut detector = SosDetector::new();
        for i in 0..4 {
            click(&mut detector, i * 500);
        }
        // Gap of more than two seconds
        assert_eq!(click(&mut detector, 5_000), None);
        for i in 1..4 {
            assert_eq!(click(&mut detector, 5_000 + i * 500), None);
        }
        assert_eq!(click(&mut detector, 7_000), Some(Gesture::SosRaised));
    }

    #[test]
    fn one_click_clears_an_active_sos() {
        let mut detector = SosDetector::new();
        detector.update(true, 0);
        detector.update(true, 5_000);
        detector.update(false, 5_200);

        assert_eq!(click(&mut detector, 8_000), Some(Gesture::SosCleared));
        assert!(!detector.is_active());
        // Cleared state counts clicks from scratch
        assert_eq!(click(&mut detector, 9_000), None);
    }
}
