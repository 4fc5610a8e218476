//! Sensor timelines for the runtime tests

use hazardguard_core::alarm::Reading;
use hazardguard_core::errors::SensorError;
use hazardguard_core::sensors::{ScriptStep, ScriptedSensor, StepOutcome};

/// CO at 10 ppm, 120 ppm from `leak_at`, back to 10 ppm from `clear_at`
pub fn co_leak(leak_at: u32, clear_at: u32) -> ScriptedSensor {
    ScriptedSensor::new(vec![
        ScriptStep::value(0, Reading::Scalar(10.0)),
        ScriptStep::value(leak_at, Reading::Scalar(120.0)),
        ScriptStep::value(clear_at, Reading::Scalar(10.0)),
    ])
}

/// Critical CO from the first read onwards
pub fn co_critical() -> ScriptedSensor {
    ScriptedSensor::constant(Reading::Scalar(120.0))
}

/// Reads fail with a timeout from `from` onwards
pub fn failing_after(value: f32, from: u32) -> ScriptedSensor {
    ScriptedSensor::new(vec![
        ScriptStep::value(0, Reading::Scalar(value)),
        ScriptStep {
            at_ms: from,
            outcome: StepOutcome::Fail(SensorError::Timeout),
        },
    ])
}
