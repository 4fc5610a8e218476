//! Timeline replay for simulation mode

use alloc::vec::Vec;

use crate::alarm::Reading;
use crate::errors::SensorError;
use crate::time::{elapsed_ms, Timestamp};
use crate::traits::Sensor;

/// What the sensor reports from a step onwards
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Value(Reading),
    /// Device answers without a measurement
    Missing,
    Fail(SensorError),
}

/// Outcome in effect from `at_ms` after the first read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStep {
    pub at_ms: u32,
    pub outcome: StepOutcome,
}

impl ScriptStep {
    pub const fn value(at_ms: u32, reading: Reading) -> Self {
        Self {
            at_ms,
            outcome: StepOutcome::Value(reading),
        }
    }
}

/// Sensor that replays a timeline relative to its first read
///
/// Reads before the first step return `Ok(None)`. With
/// [`repeat_every`](Self::repeat_every) the timeline loops.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    steps: Vec<ScriptStep>,
    origin: Option<Timestamp>,
    period_ms: Option<u32>,
    reads: u32,
}

impl ScriptedSensor {
    pub fn new(mut steps: Vec<ScriptStep>) -> Self {
        steps.sort_by_key(|step| step.at_ms);
        Self {
            steps,
            origin: None,
            period_ms: None,
            reads: 0,
        }
    }

    /// Constant reading forever
    pub fn constant(reading: Reading) -> Self {
        Self::new(alloc::vec![ScriptStep::value(0, reading)])
    }

    pub fn repeat_every(mut self, period_ms: u32) -> Self {
        self.period_ms = Some(period_ms).filter(|period| *period > 0);
        self
    }

    /// Completed reads so far
    pub fn reads(&self) -> u32 {
        self.reads
    }

    fn outcome_at(&self, offset: u32) -> Option<StepOutcome> {
        self.steps
            .iter()
            .take_while(|step| step.at_ms <= offset)
            .last()
            .map(|step| step.outcome)
    }
}

impl Sensor for ScriptedSensor {
    fn poll_read(&mut self, now: Timestamp) -> nb::Result<Option<Reading>, SensorError> {
        let origin = *self.origin.get_or_insert(now);
        let mut offset = elapsed_ms(now, origin);
        if let Some(period) = self.period_ms {
            offset %= period;
        }
        self.reads += 1;

        match self.outcome_at(offset) {
            Some(StepOutcome::Value(reading)) => Ok(Some(reading)),
            Some(StepOutcome::Missing) | None => Ok(None),
            Some(StepOutcome::Fail(error)) => Err(nb::Error::Other(error)),
        }
    }
}
