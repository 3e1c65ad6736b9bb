// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use canonical_error::CanonicalError;
use log::info;

use crate::imu_trait::{ImuTrait, SensorReading};

/// Reports IMU readings relative to the first reading taken through this
/// wrapper. The first accel read and the first gyro read each become the
/// reference for that sensor and are reported as zero. References are never
/// updated; make a new RelativeImu to re-zero.
pub struct RelativeImu<I: ImuTrait> {
    imu: I,
    ref_accel: Option<SensorReading>,
    ref_gyro: Option<SensorReading>,
}

impl<I: ImuTrait> RelativeImu<I> {
    pub fn new(imu: I) -> Self {
        RelativeImu { imu, ref_accel: None, ref_gyro: None }
    }

    pub fn read_relative_accel(&mut self, in_g: bool)
                               -> Result<SensorReading, CanonicalError> {
        let current = self.imu.read_accel(in_g)?;
        match self.ref_accel {
            Some(reference) => Ok(current - reference),
            None => {
                info!("Accel reference: x={:.4}, y={:.4}, z={:.4}",
                      current.x, current.y, current.z);
                self.ref_accel = Some(current);
                Ok(SensorReading::default())
            }
        }
    }

    pub fn read_relative_gyro(&mut self) -> Result<SensorReading, CanonicalError> {
        let current = self.imu.read_gyro()?;
        match self.ref_gyro {
            Some(reference) => Ok(current - reference),
            None => {
                info!("Gyro reference: x={:.4}, y={:.4}, z={:.4}",
                      current.x, current.y, current.z);
                self.ref_gyro = Some(current);
                Ok(SensorReading::default())
            }
        }
    }

    pub fn accel_reference(&self) -> Option<SensorReading> {
        self.ref_accel
    }

    pub fn gyro_reference(&self) -> Option<SensorReading> {
        self.ref_gyro
    }
}

#[cfg(test)]
pub mod fake {
    use std::collections::VecDeque;

    use canonical_error::{CanonicalError, unavailable_error};

    use crate::imu_trait::{ImuTrait, SensorReading};

    /// Replays scripted readings; errors once a script runs out.
    #[derive(Default)]
    pub struct ScriptedImu {
        pub accel: VecDeque<SensorReading>,
        pub gyro: VecDeque<SensorReading>,
    }

    impl ImuTrait for ScriptedImu {
        fn read_accel(&mut self, _in_g: bool)
                      -> Result<SensorReading, CanonicalError> {
            self.accel.pop_front().ok_or_else(|| unavailable_error("no accel"))
        }

        fn read_gyro(&mut self) -> Result<SensorReading, CanonicalError> {
            self.gyro.pop_front().ok_or_else(|| unavailable_error("no gyro"))
        }

        fn get_model(&self) -> String {
            "scripted".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::fake::ScriptedImu;

    #[test]
    fn test_first_read_is_zero() {
        let mut imu = ScriptedImu::default();
        imu.accel.push_back(SensorReading::new(3.0, 2.0, -1.0));
        imu.gyro.push_back(SensorReading::new(0.5, 0.25, 0.125));
        let mut rel = RelativeImu::new(imu);
        assert_eq!(rel.accel_reference(), None);

        assert_eq!(rel.read_relative_accel(false).unwrap(), SensorReading::default());
        assert_eq!(rel.accel_reference(), Some(SensorReading::new(3.0, 2.0, -1.0)));
        // Gyro reference is independent of the accel one.
        assert_eq!(rel.gyro_reference(), None);
        assert_eq!(rel.read_relative_gyro().unwrap(), SensorReading::default());
        assert_eq!(rel.gyro_reference(), Some(SensorReading::new(0.5, 0.25, 0.125)));
    }

    #[test]
    fn test_later_reads_subtract_reference() {
        let mut imu = ScriptedImu::default();
        imu.accel.extend([SensorReading::new(1.0, 2.0, 3.0),
                          SensorReading::new(1.1, 1.5, 3.0),
                          SensorReading::new(-1.0, 2.0, 9.0)]);
        let mut rel = RelativeImu::new(imu);
        rel.read_relative_accel(true).unwrap();
        assert_eq!(rel.read_relative_accel(true).unwrap(),
                   SensorReading::new(1.1 - 1.0, 1.5 - 2.0, 0.0));
        assert_eq!(rel.read_relative_accel(true).unwrap(),
                   SensorReading::new(-2.0, 0.0, 6.0));
        // Reference is unchanged by later reads.
        assert_eq!(rel.accel_reference(), Some(SensorReading::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_failed_read_sets_no_reference() {
        let mut rel = RelativeImu::new(ScriptedImu::default());
        assert!(rel.read_relative_gyro().is_err());
        assert_eq!(rel.gyro_reference(), None);
    }
}
