//! Sensing node snapshot
//!
//! Published on every data frame and alarm event. Missing or non-finite
//! readings travel as `null`; the receiver treats them as "no measurement".
//! Values are rounded to one decimal and clamped to [`WIRE_LIMIT`] so the
//! largest possible frame still fits a single datagram.

use hazardguard_core::alarm::{AlarmEngine, AlarmLevel, AlarmSource, ChannelId, Reading, SystemAlarm};
use hazardguard_core::constants::alarm::PRESENCE_CRITICAL_CM;
use hazardguard_core::link::Payload;
use serde::{Deserialize, Serialize};

/// Largest magnitude a reading may have on the wire
pub const WIRE_LIMIT: f32 = 99_999.9;

fn compact(value: f32) -> Option<f32> {
    if !value.is_finite() {
        return None;
    }
    let scaled = value.clamp(-WIRE_LIMIT, WIRE_LIMIT) * 10.0;
    let rounded = (if scaled >= 0.0 { scaled + 0.5 } else { scaled - 0.5 }) as i32;
    Some(rounded as f32 / 10.0)
}

/// Latest channel values
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorValues {
    /// Temperature, °C
    #[serde(rename = "T")]
    pub temperature: Option<f32>,
    /// Carbon monoxide, ppm
    #[serde(rename = "C")]
    pub co: Option<f32>,
    /// Ultrasonic distance, cm
    #[serde(rename = "U")]
    pub distance: Option<f32>,
    /// Something is closer than the presence threshold
    #[serde(rename = "P")]
    pub presence: bool,
    #[serde(rename = "H")]
    pub heart: HeartValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeartValues {
    #[serde(rename = "b")]
    pub bpm: Option<f32>,
    #[serde(rename = "o")]
    pub spo2: Option<f32>,
}

/// Front panel buttons, pressed = true
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Buttons {
    #[serde(rename = "1")]
    pub one: bool,
    #[serde(rename = "2")]
    pub two: bool,
    #[serde(rename = "3")]
    pub three: bool,
}

/// System alarm as seen by the sensing node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlarmPanel {
    #[serde(rename = "L")]
    pub level: AlarmLevel,
    #[serde(rename = "S")]
    pub source: Option<AlarmSource>,
    /// Manual SOS latch
    #[serde(rename = "M")]
    pub sos: bool,
}

impl AlarmPanel {
    pub fn system(&self) -> SystemAlarm {
        SystemAlarm {
            level: self.level,
            source: self.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorSnapshot {
    #[serde(rename = "s")]
    pub sensors: SensorValues,
    #[serde(rename = "B")]
    pub buttons: Buttons,
    #[serde(rename = "A")]
    pub alarm: AlarmPanel,
}

impl Payload for SensorSnapshot {
    const SCHEMA_VERSION: u16 = 1;
}

impl SensorValues {
    /// Collect the engine's latest readings
    pub fn from_engine(engine: &AlarmEngine) -> Self {
        let scalar = |channel| {
            engine
                .reading(channel)
                .and_then(|reading| reading.scalar())
                .and_then(compact)
        };
        let distance = scalar(ChannelId::Presence);
        let heart = match engine.reading(ChannelId::Vitals) {
            Some(Reading::Vitals { bpm, spo2 }) => HeartValues {
                bpm: compact(bpm),
                spo2: compact(spo2),
            },
            _ => HeartValues::default(),
        };

        Self {
            temperature: scalar(ChannelId::Temperature),
            co: scalar(ChannelId::Gas),
            distance,
            presence: distance.is_some_and(|cm| cm <= PRESENCE_CRITICAL_CM),
            heart,
        }
    }
}

impl SensorSnapshot {
    pub fn new(engine: &AlarmEngine, system: SystemAlarm, buttons: Buttons) -> Self {
        Self {
            sensors: SensorValues::from_engine(engine),
            buttons,
            alarm: AlarmPanel {
                level: system.level,
                source: system.source,
                sos: engine.manual_active(),
            },
        }
    }
}
