//! Node configuration
//!
//! Loaded once, validated once. [`NodeConfig`] mirrors the configuration
//! file field for field; nothing has a default, so a missing or misspelled
//! key is a parse error rather than a silently different node.
//! [`NodeConfig::validate`] turns it into a [`RuntimeConfig`], the only
//! form the runtime accepts.
//!
//! ```json
//! {
//!   "schedule": { "logic_interval_ms": 200, "diagnostics_interval_ms": 10000, "manual_override_ms": 10000 },
//!   "link": { "role": "initiator", "timings": { "send_interval_ms": 200, "ack_timeout_ms": 3000,
//!             "max_retries": 1, "stale_timeout_ms": 15000, "reinit_interval_ms": 5000 } },
//!   "channels": [
//!     { "channel": "co", "enabled": true, "read_interval_ms": 1000,
//!       "threshold": { "kind": "at_least", "limit": 50.0 },
//!       "timings": { "warning_ms": 5000, "danger_ms": 30000, "recovery_ms": 10000 },
//!       "reading_policy": "hold_last" }
//!   ]
//! }
//! ```

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmTimings, ChannelConfig, ChannelId, ReadingPolicy, Threshold};
use crate::constants::{alarm, time as intervals, MAX_CHANNELS};
use crate::errors::ConfigError;
use crate::link::{LinkTimings, Role};

/// Cadence of the fixed tick tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    pub logic_interval_ms: u32,
    pub diagnostics_interval_ms: u32,
    /// How long an injected reading suppresses automatic reads
    pub manual_override_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    pub role: Role,
    pub timings: LinkTimings,
}

/// One alarm channel plus its read cadence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSettings {
    pub channel: ChannelId,
    pub enabled: bool,
    pub read_interval_ms: u32,
    pub threshold: Threshold,
    pub timings: AlarmTimings,
    pub reading_policy: ReadingPolicy,
}

impl ChannelSettings {
    pub fn alarm(&self) -> ChannelConfig {
        ChannelConfig {
            channel: self.channel,
            enabled: self.enabled,
            threshold: self.threshold,
            timings: self.timings,
            reading_policy: self.reading_policy,
        }
    }
}

/// Configuration as written in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub schedule: ScheduleConfig,
    pub link: LinkConfig,
    pub channels: Vec<ChannelSettings>,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    schedule: ScheduleConfig,
    link: LinkConfig,
    channels: heapless::Vec<ChannelSettings, MAX_CHANNELS>,
}

impl RuntimeConfig {
    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn role(&self) -> Role {
        self.link.role
    }

    pub fn link_timings(&self) -> &LinkTimings {
        &self.link.timings
    }

    pub fn channels(&self) -> &[ChannelSettings] {
        &self.channels
    }

    pub fn channel(&self, channel: ChannelId) -> Option<&ChannelSettings> {
        self.channels.iter().find(|settings| settings.channel == channel)
    }

    /// Alarm engine view of the channels
    pub fn alarm_channels(&self) -> heapless::Vec<ChannelConfig, MAX_CHANNELS> {
        self.channels.iter().map(ChannelSettings::alarm).collect()
    }
}

impl NodeConfig {
    /// Parse JSON; structural problems become [`ConfigError::Parse`]
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|error| ConfigError::Parse {
            line: error.line(),
            column: error.column(),
        })
    }

    pub fn validate(&self) -> Result<RuntimeConfig, ConfigError> {
        let schedule = [
            ("logic_interval_ms", self.schedule.logic_interval_ms),
            ("diagnostics_interval_ms", self.schedule.diagnostics_interval_ms),
            ("manual_override_ms", self.schedule.manual_override_ms),
        ];
        if let Some((field, _)) = schedule.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroInterval { field: *field });
        }
        self.link.timings.validate()?;

        let mut channels = heapless::Vec::<ChannelSettings, MAX_CHANNELS>::new();
        for settings in &self.channels {
            if channels.iter().any(|seen| seen.channel == settings.channel) {
                return Err(ConfigError::DuplicateChannel {
                    channel: settings.channel.as_str(),
                });
            }
            if settings.read_interval_ms == 0 {
                return Err(ConfigError::ZeroInterval {
                    field: "read_interval_ms",
                });
            }
            settings.alarm().validate()?;
            channels
                .push(*settings)
                .map_err(|_| ConfigError::TooManyChannels { max: MAX_CHANNELS })?;
        }

        Ok(RuntimeConfig {
            schedule: self.schedule,
            link: self.link,
            channels,
        })
    }

    /// Board defaults for the node that carries the sensors
    pub fn sensing_node() -> Self {
        Self {
            schedule: default_schedule(),
            link: LinkConfig {
                role: Role::Initiator,
                timings: LinkTimings::default(),
            },
            channels: default_channels(),
        }
    }

    /// Board defaults for the node that drives LEDs, buzzer and display
    pub fn actuating_node() -> Self {
        Self {
            schedule: default_schedule(),
            link: LinkConfig {
                role: Role::Responder,
                timings: LinkTimings::default(),
            },
            channels: Vec::new(),
        }
    }
}

fn default_schedule() -> ScheduleConfig {
    ScheduleConfig {
        logic_interval_ms: intervals::LOGIC_INTERVAL_MS,
        diagnostics_interval_ms: intervals::DIAGNOSTICS_INTERVAL_MS,
        manual_override_ms: intervals::MANUAL_OVERRIDE_WINDOW_MS,
    }
}

fn channel(
    channel: ChannelId,
    read_interval_ms: u32,
    threshold: Threshold,
    timings: Result<AlarmTimings, ConfigError>,
) -> Option<ChannelSettings> {
    Some(ChannelSettings {
        channel,
        enabled: true,
        read_interval_ms,
        threshold,
        timings: timings.ok()?,
        reading_policy: ReadingPolicy::HoldLast,
    })
}

fn default_channels() -> Vec<ChannelSettings> {
    [
        channel(
            ChannelId::Gas,
            intervals::GAS_READ_INTERVAL_MS,
            Threshold::AtLeast {
                limit: alarm::CO_CRITICAL_PPM,
            },
            AlarmTimings::new(alarm::CO_WARNING_MS, alarm::CO_DANGER_MS, alarm::CO_RECOVERY_MS),
        ),
        channel(
            ChannelId::Temperature,
            intervals::TEMPERATURE_READ_INTERVAL_MS,
            Threshold::OutsideRange {
                min: alarm::TEMP_MIN_C,
                max: alarm::TEMP_MAX_C,
            },
            AlarmTimings::new(alarm::TEMP_WARNING_MS, alarm::TEMP_DANGER_MS, alarm::TEMP_RECOVERY_MS),
        ),
        channel(
            ChannelId::Vitals,
            intervals::VITALS_READ_INTERVAL_MS,
            Threshold::Vitals {
                bpm_min: alarm::HR_MIN_BPM,
                bpm_max: alarm::HR_MAX_BPM,
                spo2_min: alarm::SPO2_MIN_PCT,
            },
            AlarmTimings::new(alarm::VITALS_WARNING_MS, alarm::VITALS_DANGER_MS, alarm::VITALS_RECOVERY_MS),
        ),
        channel(
            ChannelId::Presence,
            intervals::PRESENCE_READ_INTERVAL_MS,
            Threshold::AtMost {
                limit: alarm::PRESENCE_CRITICAL_CM,
            },
            AlarmTimings::new(
                alarm::PRESENCE_WARNING_MS,
                alarm::PRESENCE_DANGER_MS,
                alarm::PRESENCE_RECOVERY_MS,
            ),
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}
