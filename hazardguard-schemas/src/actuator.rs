//! Actuating node snapshot
//!
//! The logical output state of the actuating board, published back to the
//! sensing node in data frames and acks.

use alloc::string::String;

use hazardguard_core::link::Payload;
use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// Characters per display line
pub const DISPLAY_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedMode {
    #[default]
    Off,
    On,
    Blinking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Leds {
    #[serde(rename = "g")]
    pub green: LedMode,
    #[serde(rename = "b")]
    pub blue: LedMode,
    #[serde(rename = "r")]
    pub red: LedMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Servo {
    /// Degrees, `null` until the servo has been driven
    #[serde(rename = "a")]
    pub angle: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Buzzer {
    On,
    #[default]
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Audio {
    Play,
    #[default]
    Stop,
}

/// Two-line character display
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayLines {
    #[serde(rename = "1")]
    line1: String,
    #[serde(rename = "2")]
    line2: String,
}

impl DisplayLines {
    /// Exact text; rejects lines the panel cannot show
    pub fn try_new(line1: &str, line2: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            line1: checked(1, line1)?,
            line2: checked(2, line2)?,
        })
    }

    /// Truncate to the panel width and replace anything unprintable
    pub fn fit(line1: &str, line2: &str) -> Self {
        Self {
            line1: fitted(line1),
            line2: fitted(line2),
        }
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }
}

// Quotes and backslashes would be escaped on the wire and grow the frame
fn printable(c: char) -> bool {
    (' '..='~').contains(&c) && c != '"' && c != '\\'
}

fn checked(line: u8, text: &str) -> Result<String, SchemaError> {
    if !text.chars().all(printable) {
        return Err(SchemaError::UnsupportedText { line });
    }
    if text.len() > DISPLAY_WIDTH {
        return Err(SchemaError::LineTooLong {
            line,
            len: text.len(),
            max: DISPLAY_WIDTH,
        });
    }
    Ok(String::from(text))
}

fn fitted(text: &str) -> String {
    text.chars()
        .take(DISPLAY_WIDTH)
        .map(|c| if printable(c) { c } else { '?' })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActuatorSnapshot {
    #[serde(rename = "L")]
    pub leds: Leds,
    #[serde(rename = "S")]
    pub servo: Servo,
    #[serde(rename = "D")]
    pub display: DisplayLines,
    #[serde(rename = "B")]
    pub buzzer: Buzzer,
    #[serde(rename = "A")]
    pub audio: Audio,
    /// Manual SOS latch raised on this board
    #[serde(rename = "O")]
    pub sos: bool,
}

impl Payload for ActuatorSnapshot {
    const SCHEMA_VERSION: u16 = 1;
}
