// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use canonical_error::CanonicalError;
use log::{debug, info, warn};

use crate::imu_trait::{ImuTrait, SensorReading};
use crate::register_bus::{I2cRegisterBus, RegisterBus};

// MPU-6500 / MPU-6050 constants. The two parts share this register map.
pub const MPU6500_ADDR: u16 = 0x68;
const WHO_AM_I_REG: u8 = 0x75;
const PWR_MGMT_1_REG: u8 = 0x6B;
const GYRO_CONFIG: u8 = 0x1B;
const ACCEL_CONFIG: u8 = 0x1C;
const MPU6050_WHO_AM_I: u8 = 0x68;
const MPU6500_WHO_AM_I: u8 = 0x70;

// Data register addresses. Each axis is a high byte followed by a low byte.
pub const ACCEL_XOUT_H: u8 = 0x3B;
pub const ACCEL_YOUT_H: u8 = 0x3D;
pub const ACCEL_ZOUT_H: u8 = 0x3F;
pub const GYRO_XOUT_H: u8 = 0x43;
pub const GYRO_YOUT_H: u8 = 0x45;
pub const GYRO_ZOUT_H: u8 = 0x47;

const GRAVITY_MS2: f64 = 9.80665;  // Standard gravity in m/s².

/// Accelerometer full-scale range, as encoded in ACCEL_CONFIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelRange {
    G2,
    G4,
    G8,
    G16,
}

impl AccelRange {
    pub fn from_code(code: u8) -> Option<AccelRange> {
        match code {
            0x00 => Some(AccelRange::G2),
            0x08 => Some(AccelRange::G4),
            0x10 => Some(AccelRange::G8),
            0x18 => Some(AccelRange::G16),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            AccelRange::G2 => 0x00,
            AccelRange::G4 => 0x08,
            AccelRange::G8 => 0x10,
            AccelRange::G16 => 0x18,
        }
    }

    // LSB per g.
    pub fn scale_factor(&self) -> f64 {
        match self {
            AccelRange::G2 => 16384.0,
            AccelRange::G4 => 8192.0,
            AccelRange::G8 => 4096.0,
            AccelRange::G16 => 2048.0,
        }
    }

    pub fn full_scale_g(&self) -> u32 {
        match self {
            AccelRange::G2 => 2,
            AccelRange::G4 => 4,
            AccelRange::G8 => 8,
            AccelRange::G16 => 16,
        }
    }
}

/// Gyroscope full-scale range, as encoded in GYRO_CONFIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroRange {
    Deg250,
    Deg500,
    Deg1000,
    Deg2000,
}

impl GyroRange {
    pub fn from_code(code: u8) -> Option<GyroRange> {
        match code {
            0x00 => Some(GyroRange::Deg250),
            0x08 => Some(GyroRange::Deg500),
            0x10 => Some(GyroRange::Deg1000),
            0x18 => Some(GyroRange::Deg2000),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            GyroRange::Deg250 => 0x00,
            GyroRange::Deg500 => 0x08,
            GyroRange::Deg1000 => 0x10,
            GyroRange::Deg2000 => 0x18,
        }
    }

    // LSB per degree/second.
    pub fn scale_factor(&self) -> f64 {
        match self {
            GyroRange::Deg250 => 131.0,
            GyroRange::Deg500 => 65.5,
            GyroRange::Deg1000 => 32.8,
            GyroRange::Deg2000 => 16.4,
        }
    }

    pub fn full_scale_dps(&self) -> u32 {
        match self {
            GyroRange::Deg250 => 250,
            GyroRange::Deg500 => 500,
            GyroRange::Deg1000 => 1000,
            GyroRange::Deg2000 => 2000,
        }
    }
}

/// Register-level interface to the IMU. Each read converts raw counts to
/// physical units using whatever range the chip is currently configured for,
/// and returns the result in the reporting frame (see
/// `SensorReading::remapped()`). This layer does not do zero calibration.
pub struct Mpu6500<B: RegisterBus> {
    bus: B,
    // WHO_AM_I value read at construction.
    device_id: u8,
}

impl Mpu6500<I2cRegisterBus> {
    /// Opens the IMU at `device_address` on the given Raspberry Pi I2C bus.
    pub fn open(bus: u8, device_address: u16) -> Result<Self, CanonicalError> {
        let i2c = I2cRegisterBus::new(bus, device_address)?;
        let mpu = Mpu6500::new(i2c)?;
        info!("IMU opened on I2C bus {} at address 0x{:02X}",
              bus, device_address);
        Ok(mpu)
    }
}

impl<B: RegisterBus> Mpu6500<B> {
    /// Wakes the device out of sleep mode. An unexpected WHO_AM_I value is
    /// logged but does not fail construction; clones of these parts often
    /// report other IDs.
    pub fn new(bus: B) -> Result<Self, CanonicalError> {
        let mut mpu = Mpu6500 { bus, device_id: 0 };

        mpu.device_id = mpu.who_am_i()?;
        match model_name(mpu.device_id) {
            Some(model) => info!("Device: {} (WHO_AM_I: 0x{:02X})",
                                 model, mpu.device_id),
            None => warn!("Unrecognized WHO_AM_I: 0x{:02X}", mpu.device_id),
        }

        mpu.bus.write_byte(PWR_MGMT_1_REG, 0x00)?;
        Ok(mpu)
    }

    /// WHO_AM_I value seen when the device was opened.
    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    pub fn who_am_i(&mut self) -> Result<u8, CanonicalError> {
        self.bus.read_byte(WHO_AM_I_REG)
    }

    /// Reads a big-endian two's-complement 16 bit value from `register` and
    /// the register after it.
    fn read_word(&mut self, register: u8) -> Result<i16, CanonicalError> {
        let high = self.bus.read_byte(register)?;
        let low = self.bus.read_byte(register + 1)?;
        Ok(i16::from_be_bytes([high, low]))
    }

    fn read_xyz(&mut self, x_reg: u8, y_reg: u8, z_reg: u8)
                -> Result<(i16, i16, i16), CanonicalError> {
        let x = self.read_word(x_reg)?;
        let y = self.read_word(y_reg)?;
        let z = self.read_word(z_reg)?;
        Ok((x, y, z))
    }

    /// Configured accelerometer range, or None if ACCEL_CONFIG holds a value
    /// that is not one of the range codes.
    pub fn accel_range(&mut self) -> Result<Option<AccelRange>, CanonicalError> {
        Ok(AccelRange::from_code(self.bus.read_byte(ACCEL_CONFIG)?))
    }

    pub fn gyro_range(&mut self) -> Result<Option<GyroRange>, CanonicalError> {
        Ok(GyroRange::from_code(self.bus.read_byte(GYRO_CONFIG)?))
    }

    pub fn set_accel_range(&mut self, range: AccelRange) -> Result<(), CanonicalError> {
        self.bus.write_byte(ACCEL_CONFIG, range.code())
    }

    pub fn set_gyro_range(&mut self, range: GyroRange) -> Result<(), CanonicalError> {
        self.bus.write_byte(GYRO_CONFIG, range.code())
    }

    /// Current acceleration in the reporting frame; g if `in_g`, else m/s².
    /// An unrecognized range code is read as ±2g.
    pub fn get_acceleration(&mut self, in_g: bool)
                            -> Result<SensorReading, CanonicalError> {
        let (x_raw, y_raw, z_raw) =
            self.read_xyz(ACCEL_XOUT_H, ACCEL_YOUT_H, ACCEL_ZOUT_H)?;
        debug!("Raw accel: x={}, y={}, z={}", x_raw, y_raw, z_raw);

        let range = self.accel_range()?.unwrap_or_else(|| {
            debug!("Unknown accel range code, using ±2g scale");
            AccelRange::G2
        });
        let scale = range.scale_factor();
        let unit = if in_g { 1.0 } else { GRAVITY_MS2 };

        Ok(SensorReading::remapped(
            x_raw as f64 / scale * unit,
            y_raw as f64 / scale * unit,
            z_raw as f64 / scale * unit))
    }

    /// Current angular velocity in the reporting frame, degrees/second. An
    /// unrecognized range code is read as ±250°/s.
    pub fn get_angular_velocity(&mut self) -> Result<SensorReading, CanonicalError> {
        let (x_raw, y_raw, z_raw) =
            self.read_xyz(GYRO_XOUT_H, GYRO_YOUT_H, GYRO_ZOUT_H)?;
        debug!("Raw gyro: x={}, y={}, z={}", x_raw, y_raw, z_raw);

        let range = self.gyro_range()?.unwrap_or_else(|| {
            debug!("Unknown gyro range code, using ±250°/s scale");
            GyroRange::Deg250
        });
        let scale = range.scale_factor();

        Ok(SensorReading::remapped(
            x_raw as f64 / scale,
            y_raw as f64 / scale,
            z_raw as f64 / scale))
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

impl<B: RegisterBus> ImuTrait for Mpu6500<B> {
    fn read_accel(&mut self, in_g: bool) -> Result<SensorReading, CanonicalError> {
        self.get_acceleration(in_g)
    }

    fn read_gyro(&mut self) -> Result<SensorReading, CanonicalError> {
        self.get_angular_velocity()
    }

    fn get_model(&self) -> String {
        match model_name(self.device_id) {
            Some(model) => model.to_string(),
            None => format!("MPU-6500 compatible (WHO_AM_I: 0x{:02X})",
                            self.device_id),
        }
    }
}

fn model_name(who_am_i: u8) -> Option<&'static str> {
    match who_am_i {
        MPU6050_WHO_AM_I => Some("MPU-6050"),
        MPU6500_WHO_AM_I => Some("MPU-6500"),
        _ => None,
    }
}
