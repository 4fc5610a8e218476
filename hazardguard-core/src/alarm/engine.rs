//! Channel bookkeeping and system-level aggregation

use heapless::Vec;
use serde::{Deserialize, Serialize};

use super::{
    AlarmLevel, AlarmSource, AlarmTimings, ChannelAlarmState, ChannelId, LevelChange, Reading, ReadingPolicy,
    SystemAlarm, Threshold,
};
use crate::constants::MAX_CHANNELS;
use crate::errors::ConfigError;
use crate::time::Timestamp;

/// Static configuration of one alarm channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub channel: ChannelId,
    pub enabled: bool,
    pub threshold: Threshold,
    pub timings: AlarmTimings,
    pub reading_policy: ReadingPolicy,
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.threshold.validate()?;
        let wants_vitals = self.channel == ChannelId::Vitals;
        if self.threshold.expects_vitals() != wants_vitals {
            return Err(ConfigError::ThresholdMismatch {
                channel: self.channel.as_str(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ChannelSlot {
    config: ChannelConfig,
    state: ChannelAlarmState,
    reading: Option<Reading>,
    reading_at: Option<Timestamp>,
}

impl ChannelSlot {
    fn is_critical(&self) -> bool {
        self.config.enabled
            && self
                .reading
                .as_ref()
                .map_or(false, |reading| self.config.threshold.is_critical(reading))
    }
}

/// Result of one evaluation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub system: SystemAlarm,
    pub system_changed: bool,
    /// Channel level changes, in channel configuration order
    pub transitions: Vec<LevelChange, MAX_CHANNELS>,
}

/// Per-channel hysteresis plus deterministic aggregation
#[derive(Debug, Clone)]
pub struct AlarmEngine {
    slots: Vec<ChannelSlot, MAX_CHANNELS>,
    manual: bool,
    system: SystemAlarm,
}

impl AlarmEngine {
    /// Rejects duplicate channels and invalid thresholds
    pub fn new(channels: &[ChannelConfig]) -> Result<Self, ConfigError> {
        let mut slots: Vec<ChannelSlot, MAX_CHANNELS> = Vec::new();
        for config in channels {
            config.validate()?;
            if slots.iter().any(|slot| slot.config.channel == config.channel) {
                return Err(ConfigError::DuplicateChannel {
                    channel: config.channel.as_str(),
                });
            }
            slots
                .push(ChannelSlot {
                    config: *config,
                    state: ChannelAlarmState::new(config.channel),
                    reading: None,
                    reading_at: None,
                })
                .map_err(|_| ConfigError::TooManyChannels { max: MAX_CHANNELS })?;
        }

        Ok(Self {
            slots,
            manual: false,
            system: SystemAlarm::NORMAL,
        })
    }

    /// Store an accepted reading; returns false for an unknown channel
    pub fn record_reading(&mut self, channel: ChannelId, reading: Reading, now: Timestamp) -> bool {
        match self.slot_mut(channel) {
            Some(slot) => {
                slot.reading = Some(reading);
                slot.reading_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// A read failed or produced nothing; apply the channel's reading policy
    pub fn record_missing(&mut self, channel: ChannelId) -> bool {
        match self.slot_mut(channel) {
            Some(slot) => {
                if slot.config.reading_policy == ReadingPolicy::Unknown {
                    slot.reading = None;
                    slot.reading_at = None;
                }
                true
            }
            None => false,
        }
    }

    /// Run every channel's state machine once and re-aggregate
    pub fn evaluate(&mut self, now: Timestamp) -> Evaluation {
        let mut transitions = Vec::new();
        for slot in self.slots.iter_mut() {
            let critical = slot.is_critical();
            if let Some(change) = slot.state.update(critical, &slot.config.timings, now) {
                log_info!(
                    target: "hazardguard::alarm",
                    "{}: {} -> {}",
                    change.channel,
                    change.from,
                    change.to
                );
                // One slot per channel, so this cannot overflow
                let _ = transitions.push(change);
            }
        }

        let previous = self.system;
        self.system = self.aggregate();
        let system_changed = self.system != previous;
        if system_changed {
            log_warn!(
                target: "hazardguard::alarm",
                "system alarm {} (source {:?})",
                self.system.level,
                self.system.source.map(AlarmSource::as_str)
            );
        }

        Evaluation {
            system: self.system,
            system_changed,
            transitions,
        }
    }

    /// Current system alarm from channel levels and the manual latch
    pub fn aggregate(&self) -> SystemAlarm {
        aggregate_levels(
            self.slots.iter().map(|slot| (slot.state.channel(), slot.state.level())),
            self.manual,
        )
    }

    /// Latch or release the manual SOS; returns whether it changed
    pub fn set_manual(&mut self, active: bool) -> bool {
        let changed = self.manual != active;
        self.manual = active;
        if changed {
            log_warn!(target: "hazardguard::alarm", "manual SOS {}", if active { "raised" } else { "cleared" });
        }
        changed
    }

    pub fn manual_active(&self) -> bool {
        self.manual
    }

    /// System alarm as of the last evaluation
    pub fn system(&self) -> SystemAlarm {
        self.system
    }

    pub fn channel_state(&self, channel: ChannelId) -> Option<&ChannelAlarmState> {
        self.slot(channel).map(|slot| &slot.state)
    }

    pub fn channel_config(&self, channel: ChannelId) -> Option<&ChannelConfig> {
        self.slot(channel).map(|slot| &slot.config)
    }

    /// Last accepted reading, `None` if unknown
    pub fn reading(&self, channel: ChannelId) -> Option<Reading> {
        self.slot(channel).and_then(|slot| slot.reading)
    }

    pub fn reading_at(&self, channel: ChannelId) -> Option<Timestamp> {
        self.slot(channel).and_then(|slot| slot.reading_at)
    }

    /// Configured channels in configuration order
    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.slots.iter().map(|slot| slot.config.channel)
    }

    fn slot(&self, channel: ChannelId) -> Option<&ChannelSlot> {
        self.slots.iter().find(|slot| slot.config.channel == channel)
    }

    fn slot_mut(&mut self, channel: ChannelId) -> Option<&mut ChannelSlot> {
        self.slots.iter_mut().find(|slot| slot.config.channel == channel)
    }
}

/// Highest level wins; ties go to the channel with the lowest priority rank
///
/// An active manual latch forces Danger with [`AlarmSource::Manual`].
pub fn aggregate_levels<I>(levels: I, manual: bool) -> SystemAlarm
where
    I: IntoIterator<Item = (ChannelId, AlarmLevel)>,
{
    if manual {
        return SystemAlarm {
            level: AlarmLevel::Danger,
            source: Some(AlarmSource::Manual),
        };
    }

    let worst = levels
        .into_iter()
        .filter(|(_, level)| *level > AlarmLevel::Normal)
        .min_by_key(|(channel, level)| (core::cmp::Reverse(*level), channel.priority()));

    match worst {
        Some((channel, level)) => SystemAlarm {
            level,
            source: Some(AlarmSource::Channel(channel)),
        },
        None => SystemAlarm::NORMAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gas() -> ChannelConfig {
        ChannelConfig {
            channel: ChannelId::Gas,
            enabled: true,
            threshold: Threshold::AtLeast { limit: 50.0 },
            timings: AlarmTimings::new(5_000, 30_000, 10_000).unwrap(),
            reading_policy: ReadingPolicy::HoldLast,
        }
    }

    fn presence() -> ChannelConfig {
        ChannelConfig {
            channel: ChannelId::Presence,
            enabled: true,
            threshold: Threshold::AtMost { limit: 50.0 },
            timings: AlarmTimings::new(2_000, 10_000, 5_000).unwrap(),
            reading_policy: ReadingPolicy::Unknown,
        }
    }

    #[test]
    fn rejects_duplicate_channels() {
        let err = AlarmEngine::new(&[gas(), gas()]).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateChannel { channel: "co" });
    }

    #[test]
    fn rejects_threshold_of_wrong_shape() {
        let mut config = gas();
        config.threshold = Threshold::Vitals {
            bpm_min: 50.0,
            bpm_max: 120.0,
            spo2_min: 90.0,
        };
        assert_eq!(
            AlarmEngine::new(&[config]).unwrap_err(),
            ConfigError::ThresholdMismatch { channel: "co" }
        );
    }

    #[test]
    fn transitions_reported_once() {
        let mut engine = AlarmEngine::new(&[gas()]).unwrap();
        engine.record_reading(ChannelId::Gas, Reading::Scalar(120.0), 0);

        let mut changes = 0;
        let mut t = 0;
        while t <= 40_000 {
            changes += engine.evaluate(t).transitions.len();
            t += 200;
        }
        assert_eq!(changes, 2);
        assert_eq!(engine.system().level, AlarmLevel::Danger);
        assert_eq!(engine.system().source, Some(AlarmSource::Channel(ChannelId::Gas)));
    }

    #[test]
    fn system_changed_only_on_edges() {
        let mut engine = AlarmEngine::new(&[presence()]).unwrap();
        engine.record_reading(ChannelId::Presence, Reading::Scalar(10.0), 0);

        assert!(!engine.evaluate(0).system_changed);
        let warning = engine.evaluate(2_000);
        assert!(warning.system_changed);
        assert_eq!(warning.system.level, AlarmLevel::Warning);
        assert!(!engine.evaluate(2_200).system_changed);
    }

    #[test]
    fn unknown_policy_clears_reading() {
        let mut engine = AlarmEngine::new(&[gas(), presence()]).unwrap();
        engine.record_reading(ChannelId::Gas, Reading::Scalar(80.0), 0);
        engine.record_reading(ChannelId::Presence, Reading::Scalar(20.0), 0);

        engine.record_missing(ChannelId::Gas);
        engine.record_missing(ChannelId::Presence);

        assert_eq!(engine.reading(ChannelId::Gas), Some(Reading::Scalar(80.0)));
        assert_eq!(engine.reading(ChannelId::Presence), None);
        assert!(!engine.record_missing(ChannelId::Vitals));
    }

    #[test]
    fn disabled_channel_never_critical() {
        let mut config = gas();
        config.enabled = false;
        let mut engine = AlarmEngine::new(&[config]).unwrap();
        engine.record_reading(ChannelId::Gas, Reading::Scalar(500.0), 0);

        engine.evaluate(0);
        engine.evaluate(60_000);
        assert_eq!(engine.channel_state(ChannelId::Gas).map(|s| s.level()), Some(AlarmLevel::Normal));
    }

    #[test]
    fn manual_latch_overrides() {
        let mut engine = AlarmEngine::new(&[gas()]).unwrap();
        assert!(engine.set_manual(true));
        assert!(!engine.set_manual(true));

        let eval = engine.evaluate(0);
        assert!(eval.system_changed);
        assert_eq!(
            eval.system,
            SystemAlarm {
                level: AlarmLevel::Danger,
                source: Some(AlarmSource::Manual)
            }
        );

        engine.set_manual(false);
        assert_eq!(engine.evaluate(200).system, SystemAlarm::NORMAL);
    }

    #[test]
    fn tie_goes_to_priority_order() {
        let alarm = aggregate_levels(
            [
                (ChannelId::Presence, AlarmLevel::Danger),
                (ChannelId::Temperature, AlarmLevel::Danger),
                (ChannelId::Gas, AlarmLevel::Warning),
            ],
            false,
        );
        assert_eq!(alarm.level, AlarmLevel::Danger);
        assert_eq!(alarm.source, Some(AlarmSource::Channel(ChannelId::Temperature)));
    }

    fn level_strategy() -> impl Strategy<Value = AlarmLevel> {
        prop_oneof![
            Just(AlarmLevel::Normal),
            Just(AlarmLevel::Warning),
            Just(AlarmLevel::Danger),
        ]
    }

    proptest! {
        #[test]
        fn aggregate_is_max_with_priority_tiebreak(
            levels in proptest::collection::vec(level_strategy(), 4),
            order in Just(ChannelId::ALL.to_vec()).prop_shuffle(),
        ) {
            let pairs: alloc::vec::Vec<(ChannelId, AlarmLevel)> =
                order.iter().copied().zip(levels.iter().copied()).collect();
            let alarm = aggregate_levels(pairs.iter().copied(), false);

            let max = pairs.iter().map(|(_, level)| *level).max().unwrap_or_default();
            prop_assert_eq!(alarm.level, max);

            if max == AlarmLevel::Normal {
                prop_assert_eq!(alarm.source, None);
            } else {
                let expected = pairs
                    .iter()
                    .filter(|(_, level)| *level == max)
                    .map(|(channel, _)| *channel)
                    .min()
                    .map(AlarmSource::Channel);
                prop_assert_eq!(alarm.source, expected);
            }
        }
    }
}
