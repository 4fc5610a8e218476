//! Reusable sensor building blocks
//!
//! - [`ConversionSensor`]: start a slow conversion on one tick, collect the
//!   result on a later one
//! - [`ScriptedSensor`]: replays a fixed timeline (simulation mode, tests)
//! - [`VitalsSensor`]: feeds raw pulse-oximeter samples through a pluggable
//!   [`VitalsEstimator`]
//!
//! Calibration formulas stay with the board ports; these helpers only
//! handle timing and plumbing.

mod conversion;
mod scripted;
mod vitals;

pub use conversion::{Conversion, ConversionSensor};
pub use scripted::{ScriptStep, ScriptedSensor, StepOutcome};
pub use vitals::{PeakIntervalConfig, PeakIntervalEstimator, PulseSample, PulseSource, VitalsEstimator, VitalsSensor};
