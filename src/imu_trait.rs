// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::ops::Sub;

use canonical_error::CanonicalError;

// One three-axis sample from the IMU, already remapped into the reporting
// frame. Units depend on the source: m/s² or g for acceleration, degrees/second
// for angular rate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SensorReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        SensorReading { x, y, z }
    }

    // Converts a sensor-frame reading into the reporting frame: the sensor's
    // vertical z axis becomes x, y is kept, and -x becomes z.
    pub fn remapped(sensor_x: f64, sensor_y: f64, sensor_z: f64) -> Self {
        SensorReading {
            x: sensor_z,
            y: sensor_y,
            z: -sensor_x,
        }
    }
}

impl Sub for SensorReading {
    type Output = SensorReading;

    fn sub(self, other: SensorReading) -> SensorReading {
        SensorReading {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

pub trait ImuTrait {
    // Acceleration in the reporting frame. Units are g if `in_g` is set,
    // otherwise m/s².
    fn read_accel(&mut self, in_g: bool) -> Result<SensorReading, CanonicalError>;

    // Angular velocity in the reporting frame, degrees/second.
    fn read_gyro(&mut self) -> Result<SensorReading, CanonicalError>;

    // Returns the IMU's model.
    fn get_model(&self) -> String;
}
