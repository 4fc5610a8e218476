//! Instantaneous threshold tests

use serde::{Deserialize, Serialize};

use super::Reading;
use crate::errors::ConfigError;

/// "Is this reading critical right now?"
///
/// Non-finite values are never critical, and a reading of the wrong shape
/// (a scalar against a vitals threshold, or the reverse) is never critical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Threshold {
    /// Critical when `value >= limit` (gas concentration)
    AtLeast { limit: f32 },
    /// Critical when `value <= limit` (obstacle distance)
    AtMost { limit: f32 },
    /// Critical when `value < min` or `value > max` (temperature)
    OutsideRange { min: f32, max: f32 },
    /// Critical when bpm leaves `[bpm_min, bpm_max]` or SpO2 drops below `spo2_min`
    Vitals { bpm_min: f32, bpm_max: f32, spo2_min: f32 },
}

impl Threshold {
    pub fn is_critical(&self, reading: &Reading) -> bool {
        match (*self, *reading) {
            (Self::AtLeast { limit }, Reading::Scalar(v)) => v.is_finite() && v >= limit,
            (Self::AtMost { limit }, Reading::Scalar(v)) => v.is_finite() && v <= limit,
            (Self::OutsideRange { min, max }, Reading::Scalar(v)) => v.is_finite() && (v < min || v > max),
            (
                Self::Vitals {
                    bpm_min,
                    bpm_max,
                    spo2_min,
                },
                Reading::Vitals { bpm, spo2 },
            ) => {
                let bpm_bad = bpm.is_finite() && (bpm < bpm_min || bpm > bpm_max);
                let spo2_bad = spo2.is_finite() && spo2 < spo2_min;
                bpm_bad || spo2_bad
            }
            _ => false,
        }
    }

    /// Whether this threshold expects [`Reading::Vitals`]
    pub const fn expects_vitals(&self) -> bool {
        matches!(self, Self::Vitals { .. })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = |values: &[f32]| values.iter().all(|v| v.is_finite());
        match *self {
            Self::AtLeast { limit } | Self::AtMost { limit } => {
                if !finite(&[limit]) {
                    return Err(ConfigError::InvalidThreshold {
                        reason: "limit is not finite",
                    });
                }
            }
            Self::OutsideRange { min, max } => {
                if !finite(&[min, max]) {
                    return Err(ConfigError::InvalidThreshold {
                        reason: "range bound is not finite",
                    });
                }
                if min >= max {
                    return Err(ConfigError::InvalidThreshold {
                        reason: "range min must be below max",
                    });
                }
            }
            Self::Vitals {
                bpm_min,
                bpm_max,
                spo2_min,
            } => {
                if !finite(&[bpm_min, bpm_max, spo2_min]) {
                    return Err(ConfigError::InvalidThreshold {
                        reason: "vitals bound is not finite",
                    });
                }
                if bpm_min >= bpm_max {
                    return Err(ConfigError::InvalidThreshold {
                        reason: "bpm_min must be below bpm_max",
                    });
                }
            }
        }
        Ok(())
    }
}

/// What a channel keeps when a read fails or returns nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingPolicy {
    /// Keep the last accepted reading
    #[default]
    HoldLast,
    /// Forget it; an unknown reading is never critical
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_threshold_is_inclusive() {
        let co = Threshold::AtLeast { limit: 50.0 };
        assert!(!co.is_critical(&Reading::Scalar(49.9)));
        assert!(co.is_critical(&Reading::Scalar(50.0)));
        assert!(!co.is_critical(&Reading::Scalar(f32::NAN)));
        assert!(!co.is_critical(&Reading::Scalar(f32::INFINITY)));
    }

    #[test]
    fn presence_and_temperature() {
        let distance = Threshold::AtMost { limit: 50.0 };
        assert!(distance.is_critical(&Reading::Scalar(12.0)));
        assert!(!distance.is_critical(&Reading::Scalar(120.0)));

        let temp = Threshold::OutsideRange { min: 10.0, max: 35.0 };
        assert!(temp.is_critical(&Reading::Scalar(9.5)));
        assert!(temp.is_critical(&Reading::Scalar(35.5)));
        assert!(!temp.is_critical(&Reading::Scalar(35.0)));
        assert!(!temp.is_critical(&Reading::Scalar(22.0)));
    }

    #[test]
    fn vitals_either_bound() {
        let vitals = Threshold::Vitals {
            bpm_min: 50.0,
            bpm_max: 120.0,
            spo2_min: 90.0,
        };
        assert!(!vitals.is_critical(&Reading::Vitals { bpm: 72.0, spo2: 97.0 }));
        assert!(vitals.is_critical(&Reading::Vitals { bpm: 130.0, spo2: 97.0 }));
        assert!(vitals.is_critical(&Reading::Vitals { bpm: 72.0, spo2: 85.0 }));
        assert!(!vitals.is_critical(&Reading::Scalar(0.0)));
    }

    #[test]
    fn inverted_range_rejected() {
        let temp = Threshold::OutsideRange { min: 35.0, max: 10.0 };
        assert!(matches!(temp.validate(), Err(ConfigError::InvalidThreshold { .. })));

        let nan = Threshold::AtLeast { limit: f32::NAN };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn threshold_json_shape() {
        let parsed: Threshold = serde_json::from_str(r#"{"kind":"outside_range","min":10.0,"max":35.0}"#).unwrap();
        assert_eq!(parsed, Threshold::OutsideRange { min: 10.0, max: 35.0 });
    }
}
