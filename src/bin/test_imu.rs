// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use pi_imu_stream::imu6500::{Mpu6500, MPU6500_ADDR};
use pi_imu_stream::relative_imu::RelativeImu;

use canonical_error::CanonicalError;
use env_logger;

fn main() -> Result<(), CanonicalError> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Initializing IMU...");
    let mut mpu = Mpu6500::open(1, MPU6500_ADDR)?;
    match mpu.accel_range()? {
        Some(range) => log::info!("Accel range: ±{}g", range.full_scale_g()),
        None => log::info!("Accel range: unknown code, treated as ±2g"),
    }
    match mpu.gyro_range()? {
        Some(range) => log::info!("Gyro range: ±{}°/s", range.full_scale_dps()),
        None => log::info!("Gyro range: unknown code, treated as ±250°/s"),
    }

    // Read some sample data relative to the first.
    let mut imu = RelativeImu::new(mpu);
    for i in 0..5 {
        let accel = imu.read_relative_accel(/*in_g=*/false)?;
        let gyro = imu.read_relative_gyro()?;
        log::info!("Sample {}: Accel: x={:.2}m/s², y={:.2}m/s², z={:.2}m/s²",
                   i+1, accel.x, accel.y, accel.z);
        log::info!("Sample {}: Gyro: x={:.1}°/s, y={:.1}°/s, z={:.1}°/s",
                   i+1, gyro.x, gyro.y, gyro.z);
        std::thread::sleep(std::time::Duration::from_millis(500));
    }

    Ok(())
}
