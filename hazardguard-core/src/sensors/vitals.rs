//! Heart rate and SpO2 from raw pulse-oximeter samples
//!
//! The optical front end delivers paired infrared/red intensities into a
//! FIFO. [`VitalsSensor`] drains that FIFO on each read and hands the samples
//! to a [`VitalsEstimator`]; the estimate becomes a [`Reading::Vitals`].
//!
//! [`PeakIntervalEstimator`] is the default estimator:
//!
//! - **finger detection**: IR below `finger_threshold` clears the window
//! - **BPM**: 3-point IR peaks rising and falling by more than
//!   `min_prominence`; intervals outside `min_interval_ms..=max_interval_ms`
//!   are ignored, the rest averaged
//! - **SpO2**: `110 - 25 R` with `R = (AC_red / DC_red) / (AC_ir / DC_ir)`,
//!   DC the window mean and AC the mean absolute deviation; estimates
//!   outside 70..=100 % are rejected

use crate::alarm::Reading;
use crate::buffer::SampleWindow;
use crate::constants::buffers::VITALS_WINDOW_LEN;
use crate::errors::SensorError;
use crate::time::{elapsed_ms, Timestamp};
use crate::traits::Sensor;

const FIFO_DRAIN_LIMIT: usize = 32;

const SPO2_MIN_VALID: f32 = 70.0;
const SPO2_MAX_VALID: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseSample {
    pub ir: u32,
    pub red: u32,
    pub at: Timestamp,
}

/// Turns a stream of pulse samples into vitals
pub trait VitalsEstimator {
    fn push(&mut self, sample: PulseSample);

    /// Current estimate, `None` until enough signal was seen
    fn estimate(&self) -> Option<Reading>;

    fn reset(&mut self);
}

/// Optical front end with a sample FIFO
pub trait PulseSource {
    /// Next buffered sample; `Ok(None)` when the FIFO is empty
    fn next_sample(&mut self, now: Timestamp) -> Result<Option<PulseSample>, SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakIntervalConfig {
    pub finger_threshold: u32,
    pub min_prominence: u32,
    pub min_interval_ms: u32,
    pub max_interval_ms: u32,
}

impl Default for PeakIntervalConfig {
    fn default() -> Self {
        Self {
            finger_threshold: 5000,
            min_prominence: 30,
            // 240 bpm .. 25 bpm
            min_interval_ms: 250,
            max_interval_ms: 2400,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PeakIntervalEstimator<const N: usize = VITALS_WINDOW_LEN> {
    config: PeakIntervalConfig,
    window: SampleWindow<PulseSample, N>,
}

impl<const N: usize> PeakIntervalEstimator<N> {
    pub fn new(config: PeakIntervalConfig) -> Self {
        Self {
            config,
            window: SampleWindow::new(),
        }
    }

    pub fn config(&self) -> &PeakIntervalConfig {
        &self.config
    }

    pub fn finger_present(&self) -> bool {
        self.window.last().is_some_and(|sample| sample.ir >= self.config.finger_threshold)
    }

    fn is_peak(&self, before: u32, at: u32, after: u32) -> bool {
        let prominence = self.config.min_prominence;
        at > before && at > after && at - before > prominence && at - after > prominence
    }

    fn bpm(&self) -> Option<f32> {
        let mut last_peak: Option<Timestamp> = None;
        let mut total_ms = 0u32;
        let mut intervals = 0u32;

        let mut iter = self.window.iter();
        let (Some(mut before), Some(mut at)) = (iter.next(), iter.next()) else {
            return None;
        };
        for after in iter {
            if self.is_peak(before.ir, at.ir, after.ir) {
                if let Some(previous) = last_peak {
                    let interval = elapsed_ms(at.at, previous);
                    if (self.config.min_interval_ms..=self.config.max_interval_ms).contains(&interval) {
                        total_ms += interval;
                        intervals += 1;
                    }
                }
                last_peak = Some(at.at);
            }
            before = at;
            at = after;
        }

        if intervals == 0 {
            return None;
        }
        Some(60_000.0 / (total_ms as f32 / intervals as f32))
    }

    fn spo2(&self) -> Option<f32> {
        let len = self.window.len() as f32;
        let (sum_ir, sum_red) = self
            .window
            .iter()
            .fold((0u64, 0u64), |(ir, red), sample| (ir + sample.ir as u64, red + sample.red as u64));
        let dc_ir = sum_ir as f32 / len;
        let dc_red = sum_red as f32 / len;
        if dc_ir <= 0.0 || dc_red <= 0.0 {
            return None;
        }

        let (dev_ir, dev_red) = self.window.iter().fold((0.0f32, 0.0f32), |(ir, red), sample| {
            (ir + (sample.ir as f32 - dc_ir).abs(), red + (sample.red as f32 - dc_red).abs())
        });
        let ac_ir = dev_ir / len;
        let ac_red = dev_red / len;
        if ac_ir <= 0.0 {
            return None;
        }

        let ratio = (ac_red / dc_red) / (ac_ir / dc_ir);
        let spo2 = 110.0 - 25.0 * ratio;
        (SPO2_MIN_VALID..=SPO2_MAX_VALID).contains(&spo2).then_some(spo2)
    }
}

impl<const N: usize> Default for PeakIntervalEstimator<N> {
    fn default() -> Self {
        Self::new(PeakIntervalConfig::default())
    }
}

impl<const N: usize> VitalsEstimator for PeakIntervalEstimator<N> {
    fn push(&mut self, sample: PulseSample) {
        if sample.ir < self.config.finger_threshold {
            self.window.clear();
            return;
        }
        self.window.push(sample);
    }

    fn estimate(&self) -> Option<Reading> {
        if !self.finger_present() {
            return None;
        }
        let bpm = self.bpm()?;
        let spo2 = self.spo2()?;
        Some(Reading::Vitals { bpm, spo2 })
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

/// [`Sensor`] adapter over a pulse FIFO and an estimator
#[derive(Debug, Clone)]
pub struct VitalsSensor<S, E> {
    source: S,
    estimator: E,
}

impl<S: PulseSource, E: VitalsEstimator> VitalsSensor<S, E> {
    pub fn new(source: S, estimator: E) -> Self {
        Self { source, estimator }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: PulseSource, E: VitalsEstimator> Sensor for VitalsSensor<S, E> {
    fn poll_read(&mut self, now: Timestamp) -> nb::Result<Option<Reading>, SensorError> {
        for _ in 0..FIFO_DRAIN_LIMIT {
            match self.source.next_sample(now) {
                Ok(Some(sample)) => self.estimator.push(sample),
                Ok(None) => break,
                Err(error) => {
                    self.estimator.reset();
                    return Err(nb::Error::Other(error));
                }
            }
        }
        Ok(self.estimator.estimate())
    }
}
