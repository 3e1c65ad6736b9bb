// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use env_logger;
use log::{error, info};

use pi_imu_stream::imu6500::{Mpu6500, MPU6500_ADDR};
use pi_imu_stream::sensor_server::{SensorServer, DEFAULT_PORT};

/// Streams relative MPU-6500/MPU-6050 readings to one TCP client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// I2C bus number.
    #[arg(long, default_value_t = 1)]
    bus: u8,

    /// I2C address of the IMU, decimal or 0x-prefixed hex.
    #[arg(long, value_parser = parse_address, default_value_t = MPU6500_ADDR)]
    address: u16,

    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Time between samples, seconds.
    #[arg(long, value_parser = parse_duration, default_value = "0.5")]
    interval: Duration,
}

// Seconds as a float. Negative, NaN and overflowing values are rejected.
fn parse_duration(arg: &str) -> Result<Duration, String> {
    let seconds: f64 = arg.parse()
        .map_err(|e| format!("{:?} is not a number: {}", arg, e))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| format!("{:?} is not a valid duration: {}", arg, e))
}

fn parse_address(arg: &str) -> Result<u16, std::num::ParseIntError> {
    match arg.strip_prefix("0x") {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => arg.parse(),
    }
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let got_signal = Arc::new(AtomicBool::new(false));
    let got_signal2 = got_signal.clone();
    // Give the stream loop one sample interval to notice before forcing exit.
    let grace = args.interval + Duration::from_secs(1);
    ctrlc::set_handler(move || {
        info!("Got control-c");
        got_signal2.store(true, Ordering::Relaxed);
        std::thread::sleep(grace);
        info!("Exiting");
        std::process::exit(-1);
    }).unwrap();

    let mpu = match Mpu6500::open(args.bus, args.address) {
        Ok(mpu) => mpu,
        Err(e) => {
            error!("Could not open IMU: {:?}", e);
            std::process::exit(1);
        }
    };
    let mut server = match SensorServer::bind(
        ("0.0.0.0", args.port), args.interval, got_signal)
    {
        Ok(server) => server,
        Err(e) => {
            error!("Could not start server: {:?}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = server.serve(mpu) {
        error!("Stream ended: {:?}", e);
        std::process::exit(1);
    }
    info!("Server closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("0.5").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert!(parse_duration("-0.5").is_err());
        assert!(parse_duration("NaN").is_err());
        assert!(parse_duration("inf").is_err());
        assert!(parse_duration("fast").is_err());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x68").unwrap(), 0x68);
        assert_eq!(parse_address("104").unwrap(), 0x68);
        assert!(parse_address("0xZZ").is_err());
    }
}
