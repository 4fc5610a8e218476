//! Two-phase conversions
//!
//! Some devices need hundreds of milliseconds between "start" and "result"
//! (a 1-Wire temperature conversion takes up to 750 ms). Waiting would stall
//! the run loop, so the wait becomes state:
//!
//! ```text
//! tick 1   poll_read → start()  → WouldBlock
//! tick 2   poll_read            → WouldBlock   (conversion_ms not elapsed)
//! tick n   poll_read → fetch()  → Ok(reading)
//! ```

use crate::alarm::Reading;
use crate::errors::SensorError;
use crate::time::{elapsed_ms, Timestamp};
use crate::traits::Sensor;

/// Device with a separate start and fetch step
pub trait Conversion {
    fn start(&mut self) -> Result<(), SensorError>;

    /// Result of the conversion started last; `Ok(None)` if the device has nothing
    fn fetch(&mut self) -> Result<Option<Reading>, SensorError>;
}

#[derive(Debug, Clone)]
pub struct ConversionSensor<D> {
    device: D,
    conversion_ms: u32,
    started_at: Option<Timestamp>,
}

impl<D: Conversion> ConversionSensor<D> {
    pub fn new(device: D, conversion_ms: u32) -> Self {
        Self {
            device,
            conversion_ms,
            started_at: None,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: Conversion> Sensor for ConversionSensor<D> {
    fn poll_read(&mut self, now: Timestamp) -> nb::Result<Option<Reading>, SensorError> {
        match self.started_at {
            None => {
                self.device.start().map_err(nb::Error::Other)?;
                self.started_at = Some(now);
                Err(nb::Error::WouldBlock)
            }
            Some(at) if elapsed_ms(now, at) < self.conversion_ms => Err(nb::Error::WouldBlock),
            Some(_) => {
                self.started_at = None;
                self.device.fetch().map_err(nb::Error::Other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Thermometer {
        starts: u32,
        fail_fetch: bool,
    }

    impl Conversion for Thermometer {
        fn start(&mut self) -> Result<(), SensorError> {
            self.starts += 1;
            Ok(())
        }

        fn fetch(&mut self) -> Result<Option<Reading>, SensorError> {
            if self.fail_fetch {
                Err(SensorError::ReadFailed { reason: "crc mismatch" })
            } else {
                Ok(Some(Reading::Scalar(21.5)))
            }
        }
    }

    #[test]
    fn completes_on_a_later_tick() {
        let mut sensor = ConversionSensor::new(Thermometer::default(), 750);

        assert_eq!(sensor.poll_read(0), Err(nb::Error::WouldBlock));
        assert!(sensor.in_flight());
        assert_eq!(sensor.poll_read(500), Err(nb::Error::WouldBlock));
        assert_eq!(sensor.poll_read(750), Ok(Some(Reading::Scalar(21.5))));
        assert!(!sensor.in_flight());
        assert_eq!(sensor.device().starts, 1);
    }

    #[test]
    fn fetch_error_ends_the_conversion() {
        let mut sensor = ConversionSensor::new(
            Thermometer {
                fail_fetch: true,
                ..Thermometer::default()
            },
            100,
        );

        let _ = sensor.poll_read(0);
        assert!(matches!(sensor.poll_read(100), Err(nb::Error::Other(SensorError::ReadFailed { .. }))));
        assert!(!sensor.in_flight());
    }
}
