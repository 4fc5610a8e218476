//! Per-channel hysteresis state machine

use serde::{Deserialize, Serialize};

use super::{AlarmLevel, ChannelId, LevelChange};
use crate::errors::ConfigError;
use crate::time::{elapsed_ms, Timestamp};

/// How long a condition must persist before the level moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlarmTimings {
    warning_ms: u32,
    danger_ms: u32,
    recovery_ms: u32,
}

impl AlarmTimings {
    /// Rejects `danger_ms < warning_ms`
    pub const fn new(warning_ms: u32, danger_ms: u32, recovery_ms: u32) -> Result<Self, ConfigError> {
        if danger_ms < warning_ms {
            return Err(ConfigError::DangerBeforeWarning {
                warning_ms,
                danger_ms,
            });
        }
        Ok(Self {
            warning_ms,
            danger_ms,
            recovery_ms,
        })
    }

    pub const fn warning_ms(&self) -> u32 {
        self.warning_ms
    }

    pub const fn danger_ms(&self) -> u32 {
        self.danger_ms
    }

    pub const fn recovery_ms(&self) -> u32 {
        self.recovery_ms
    }

    fn level_after(&self, held_ms: u32) -> AlarmLevel {
        if held_ms >= self.danger_ms {
            AlarmLevel::Danger
        } else if held_ms >= self.warning_ms {
            AlarmLevel::Warning
        } else {
            AlarmLevel::Normal
        }
    }
}

impl<'de> Deserialize<'de> for AlarmTimings {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            warning_ms: u32,
            danger_ms: u32,
            recovery_ms: u32,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.warning_ms, raw.danger_ms, raw.recovery_ms).map_err(serde::de::Error::custom)
    }
}

/// Alarm state of one channel
///
/// Invariant: `critical_since` and `normal_since` are never both set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAlarmState {
    channel: ChannelId,
    level: AlarmLevel,
    critical_since: Option<Timestamp>,
    normal_since: Option<Timestamp>,
    last_change: Option<Timestamp>,
}

impl ChannelAlarmState {
    pub const fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            level: AlarmLevel::Normal,
            critical_since: None,
            normal_since: None,
            last_change: None,
        }
    }

    pub const fn channel(&self) -> ChannelId {
        self.channel
    }

    pub const fn level(&self) -> AlarmLevel {
        self.level
    }

    pub const fn critical_since(&self) -> Option<Timestamp> {
        self.critical_since
    }

    pub const fn normal_since(&self) -> Option<Timestamp> {
        self.normal_since
    }

    /// When the level last changed
    pub const fn last_change(&self) -> Option<Timestamp> {
        self.last_change
    }

    /// Advance the state machine by one evaluation
    ///
    /// While critical the level only rises: Warning after `warning_ms` and
    /// Danger after `danger_ms` of continuous critical condition. Once the
    /// condition clears, the level drops straight to Normal after
    /// `recovery_ms` of continuous non-critical condition; any re-assertion
    /// restarts that wait.
    pub fn update(&mut self, is_critical: bool, timings: &AlarmTimings, now: Timestamp) -> Option<LevelChange> {
        let next = if is_critical {
            self.normal_since = None;
            let since = *self.critical_since.get_or_insert(now);
            timings.level_after(elapsed_ms(now, since)).max(self.level)
        } else {
            self.critical_since = None;
            let since = *self.normal_since.get_or_insert(now);
            if elapsed_ms(now, since) >= timings.recovery_ms {
                AlarmLevel::Normal
            } else {
                self.level
            }
        };

        if next == self.level {
            return None;
        }

        let change = LevelChange {
            channel: self.channel,
            from: self.level,
            to: next,
            at: now,
        };
        self.level = next;
        self.last_change = Some(now);
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timings() -> AlarmTimings {
        AlarmTimings::new(5_000, 30_000, 10_000).unwrap()
    }

    /// Drive the state at `step` ms cadence over `[from, to)` and return it
    fn run(state: &mut ChannelAlarmState, critical: bool, from: u32, to: u32, step: u32) {
        let timings = timings();
        let mut t = from;
        while t < to {
            state.update(critical, &timings, t);
            t += step;
        }
    }

    #[test]
    fn rejects_danger_before_warning() {
        assert_eq!(
            AlarmTimings::new(5_000, 1_000, 100),
            Err(ConfigError::DangerBeforeWarning {
                warning_ms: 5_000,
                danger_ms: 1_000
            })
        );
        assert!(AlarmTimings::new(5_000, 5_000, 0).is_ok());
    }

    #[test]
    fn escalates_at_exact_boundaries() {
        let timings = timings();
        let mut state = ChannelAlarmState::new(ChannelId::Gas);

        run(&mut state, true, 0, 5_000, 100);
        assert_eq!(state.level(), AlarmLevel::Normal);

        let change = state.update(true, &timings, 5_000).unwrap();
        assert_eq!((change.from, change.to, change.at), (AlarmLevel::Normal, AlarmLevel::Warning, 5_000));

        run(&mut state, true, 5_100, 30_000, 100);
        assert_eq!(state.level(), AlarmLevel::Warning);

        let change = state.update(true, &timings, 30_000).unwrap();
        assert_eq!(change.to, AlarmLevel::Danger);

        run(&mut state, true, 30_100, 60_000, 100);
        assert_eq!(state.level(), AlarmLevel::Danger);
        assert_eq!(state.critical_since(), Some(0));
    }

    #[test]
    fn recovers_after_continuous_normal() {
        let timings = timings();
        let mut state = ChannelAlarmState::new(ChannelId::Gas);
        run(&mut state, true, 0, 60_000, 100);
        assert_eq!(state.level(), AlarmLevel::Danger);

        assert_eq!(state.update(false, &timings, 60_000), None);
        assert_eq!(state.normal_since(), Some(60_000));
        assert_eq!(state.critical_since(), None);

        run(&mut state, false, 60_100, 70_000, 100);
        assert_eq!(state.update(false, &timings, 69_999), None);
        assert_eq!(state.level(), AlarmLevel::Danger);

        let change = state.update(false, &timings, 70_000).unwrap();
        assert_eq!((change.from, change.to), (AlarmLevel::Danger, AlarmLevel::Normal));
    }

    #[test]
    fn reassertion_restarts_recovery() {
        let timings = timings();
        let mut state = ChannelAlarmState::new(ChannelId::Gas);
        run(&mut state, true, 0, 60_000, 100);
        run(&mut state, false, 60_000, 65_000, 100);

        state.update(true, &timings, 65_000);
        assert_eq!(state.normal_since(), None);
        assert_eq!(state.critical_since(), Some(65_000));

        // Short clear: not long enough to recover
        run(&mut state, false, 65_100, 74_000, 100);
        assert_eq!(state.level(), AlarmLevel::Danger);
        assert_eq!(state.normal_since(), Some(65_100));

        // Stays Danger while critical, even though the new episode is short
        run(&mut state, true, 74_000, 80_000, 100);
        assert_eq!(state.level(), AlarmLevel::Danger);

        run(&mut state, false, 80_000, 90_000, 100);
        assert_eq!(state.level(), AlarmLevel::Danger);
        assert!(state.update(false, &timings, 90_000).is_some());
        assert_eq!(state.level(), AlarmLevel::Normal);
    }

    #[test]
    fn warning_is_sticky_across_short_reassertion() {
        let timings = timings();
        let mut state = ChannelAlarmState::new(ChannelId::Temperature);
        run(&mut state, true, 0, 6_000, 100);
        assert_eq!(state.level(), AlarmLevel::Warning);

        run(&mut state, false, 6_000, 8_000, 100);
        run(&mut state, true, 8_000, 9_000, 100);
        assert_eq!(state.level(), AlarmLevel::Warning);
    }

    #[test]
    fn never_both_timestamps() {
        let timings = timings();
        let mut state = ChannelAlarmState::new(ChannelId::Presence);
        for (i, critical) in [true, false, true, true, false, false, true].into_iter().enumerate() {
            state.update(critical, &timings, i as u32 * 1_000);
            assert!(state.critical_since().is_none() || state.normal_since().is_none());
        }
    }

    #[test]
    fn timings_deserialize_with_validation() {
        let ok: AlarmTimings =
            serde_json::from_str(r#"{"warning_ms":1,"danger_ms":2,"recovery_ms":3}"#).unwrap();
        assert_eq!(ok.danger_ms(), 2);

        let bad: Result<AlarmTimings, _> =
            serde_json::from_str(r#"{"warning_ms":5,"danger_ms":2,"recovery_ms":3}"#);
        assert!(bad.is_err());
    }
}
