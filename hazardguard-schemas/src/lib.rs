//! Link Payloads for HazardGuard Nodes
//!
//! ## Overview
//!
//! The two nodes publish different snapshots over the same link:
//!
//! | Payload | Published by | Carries |
//! |---|---|---|
//! | [`SensorSnapshot`] | sensing node | latest readings, button states, system alarm |
//! | [`ActuatorSnapshot`] | actuating node | logical LED/servo/display/buzzer/audio state, SOS latch |
//!
//! Both are wrapped in the core frame (`{"v","t","id","ts","r","p"}`), so a
//! full datagram looks like:
//!
//! ```json
//! {"v":1,"t":"data","id":7,"ts":9622,
//!  "p":{"s":{"T":25.0,"C":12.0,"U":140.0,"P":false,"H":{"b":72.0,"o":98.0}},
//!       "B":{"1":false,"2":false,"3":false},
//!       "A":{"L":"normal","S":null,"M":false}}}
//! ```
//!
//! ## Key Choice
//!
//! Single-letter keys are what the deployed boards already speak and keep
//! every frame well under the 250-byte radio limit. Display text is
//! restricted to 16 printable ASCII characters per line for the same reason.
//!
//! ## Schema Evolution
//!
//! Each payload has its own `SCHEMA_VERSION`. A receiver built for another
//! version skips the frame and counts it; there is no in-band negotiation.
//! Bump the version whenever a field changes meaning or becomes required.
//!
//! ## Node Applications
//!
//! [`nodes`] holds the reference collaborators that turn core state into
//! these payloads and back: [`SensorNodeApp`] and [`ActuatorNodeApp`].

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod actuator;
pub mod nodes;
pub mod sensor;
pub mod sos;

pub use actuator::{ActuatorSnapshot, Audio, Buzzer, DisplayLines, LedMode, Leds, Servo, DISPLAY_WIDTH};
pub use nodes::{render_outputs, ActuatorNodeApp, SensorNodeApp};
pub use sensor::{AlarmPanel, Buttons, HeartValues, SensorSnapshot, SensorValues};
pub use sos::{Gesture, SosDetector};

use thiserror_no_std::Error;

/// Payload construction errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaError {
    /// Display text longer than the panel
    #[error("display line {line} is {len} characters, at most {max} fit")]
    LineTooLong { line: u8, len: usize, max: usize },

    /// Display text the panel cannot show
    #[error("display line {line} contains unsupported characters")]
    UnsupportedText { line: u8 },
}
