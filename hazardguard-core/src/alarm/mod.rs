//! Multi-level hysteresis alarm engine
//!
//! Noisy instantaneous readings become stable alarm levels in three steps:
//!
//! ```text
//!  Reading ──▶ Threshold ──▶ ChannelAlarmState ──▶ aggregate ──▶ SystemAlarm
//!             (critical?)    (Normal/Warning/      (max level,
//!                             Danger, hysteresis)   priority tie-break)
//! ```
//!
//! ## Channel priority
//!
//! When several channels share the highest level, the source reported for
//! the system alarm is the first of:
//!
//! 1. [`ChannelId::Gas`]
//! 2. [`ChannelId::Temperature`]
//! 3. [`ChannelId::Vitals`]
//! 4. [`ChannelId::Presence`]
//!
//! This is the declaration order of [`ChannelId`] and is a stable contract.
//! A manual SOS latch overrides aggregation and reports [`AlarmSource::Manual`].

mod engine;
mod hysteresis;
mod threshold;

pub use engine::{aggregate_levels, AlarmEngine, ChannelConfig, Evaluation};
pub use hysteresis::{AlarmTimings, ChannelAlarmState};
pub use threshold::{ReadingPolicy, Threshold};

use alloc::string::String;
use core::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::time::Timestamp;

/// Severity of a channel or of the whole system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmLevel {
    #[default]
    Normal,
    Warning,
    Danger,
}

impl AlarmLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

impl fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AlarmLevel {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.as_str())
    }
}

/// A monitored quantity, in tie-break priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    /// Carbon monoxide concentration
    #[serde(rename = "co")]
    Gas,
    /// Ambient temperature
    #[serde(rename = "temp")]
    Temperature,
    /// Heart rate and oxygen saturation
    #[serde(rename = "heart")]
    Vitals,
    /// Ultrasonic obstacle distance
    #[serde(rename = "ultrasonic")]
    Presence,
}

impl ChannelId {
    /// Every channel, highest priority first
    pub const ALL: [ChannelId; 4] = [Self::Gas, Self::Temperature, Self::Vitals, Self::Presence];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gas => "co",
            Self::Temperature => "temp",
            Self::Vitals => "heart",
            Self::Presence => "ultrasonic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.as_str() == name)
    }

    /// Tie-break rank; lower wins
    pub const fn priority(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What drove the system alarm
///
/// Serialized as a bare string: a channel's wire name or `"manual"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmSource {
    Channel(ChannelId),
    Manual,
}

impl AlarmSource {
    const NAMES: &'static [&'static str] = &["co", "temp", "heart", "ultrasonic", "manual"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Channel(channel) => channel.as_str(),
            Self::Manual => "manual",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        if name == "manual" {
            return Some(Self::Manual);
        }
        ChannelId::from_name(name).map(Self::Channel)
    }
}

impl Serialize for AlarmSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AlarmSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_name(&name).ok_or_else(|| de::Error::unknown_variant(&name, Self::NAMES))
    }
}

/// System-wide alarm derived from all channels on every evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemAlarm {
    pub level: AlarmLevel,
    pub source: Option<AlarmSource>,
}

impl SystemAlarm {
    pub const NORMAL: SystemAlarm = SystemAlarm {
        level: AlarmLevel::Normal,
        source: None,
    };
}

/// One channel changed level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub channel: ChannelId,
    pub from: AlarmLevel,
    pub to: AlarmLevel,
    pub at: Timestamp,
}

/// An instantaneous measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Single value in the channel's unit (ppm, °C, cm)
    Scalar(f32),
    /// Pulse oximeter output
    Vitals { bpm: f32, spo2: f32 },
}

impl Reading {
    pub fn scalar(&self) -> Option<f32> {
        match self {
            Self::Scalar(value) => Some(*value),
            Self::Vitals { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_severity() {
        assert!(AlarmLevel::Danger > AlarmLevel::Warning);
        assert!(AlarmLevel::Warning > AlarmLevel::Normal);
        assert_eq!(AlarmLevel::default(), AlarmLevel::Normal);
    }

    #[test]
    fn channel_priority_follows_declaration() {
        let ranks: alloc::vec::Vec<u8> = ChannelId::ALL.iter().map(|c| c.priority()).collect();
        assert_eq!(ranks, [0, 1, 2, 3]);
    }

    #[test]
    fn alarm_uses_wire_names() {
        let alarm = SystemAlarm {
            level: AlarmLevel::Danger,
            source: Some(AlarmSource::Channel(ChannelId::Gas)),
        };
        let json = serde_json::to_string(&alarm).unwrap();
        assert_eq!(json, r#"{"level":"danger","source":"co"}"#);

        let manual: SystemAlarm =
            serde_json::from_str(r#"{"level":"warning","source":"manual"}"#).unwrap();
        assert_eq!(manual.source, Some(AlarmSource::Manual));
    }

    #[test]
    fn unknown_source_is_rejected() {
        let result: Result<AlarmSource, _> = serde_json::from_str(r#""smoke""#);
        assert!(result.is_err());
    }
}
