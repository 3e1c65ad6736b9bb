// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use canonical_error::CanonicalError;
use clap::Parser;
use env_logger;
use log::info;

use pi_imu_stream::pwm_sweeper::{
    PwmSweeper, SoftPwmPin, DEFAULT_FREQUENCY_HZ, DEFAULT_INITIAL_DUTY,
    DEFAULT_PIN, DEFAULT_STEP};

/// Sweeps a software PWM duty cycle up and down on one GPIO pin until
/// interrupted.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// GPIO pin, BCM numbering.
    #[arg(long, default_value_t = DEFAULT_PIN)]
    pin: u8,

    /// PWM frequency, Hz.
    #[arg(long, default_value_t = DEFAULT_FREQUENCY_HZ)]
    frequency: f64,

    /// Duty cycle percent applied before the sweep starts.
    #[arg(long, default_value_t = DEFAULT_INITIAL_DUTY)]
    initial_duty: u8,

    /// Duty cycle increment, percent.
    #[arg(long, default_value_t = DEFAULT_STEP)]
    step: u8,

    /// How long each duty cycle is held, seconds.
    #[arg(long, value_parser = parse_duration, default_value = "1.0")]
    hold: Duration,
}

// Seconds as a float. Negative, NaN and overflowing values are rejected.
fn parse_duration(arg: &str) -> Result<Duration, String> {
    let seconds: f64 = arg.parse()
        .map_err(|e| format!("{:?} is not a number: {}", arg, e))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| format!("{:?} is not a valid duration: {}", arg, e))
}

fn main() -> Result<(), CanonicalError> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let got_signal = Arc::new(AtomicBool::new(false));
    let got_signal2 = got_signal.clone();
    // The sweeper notices the signal at the end of the current hold.
    let grace = args.hold + Duration::from_secs(1);
    ctrlc::set_handler(move || {
        info!("Got control-c");
        got_signal2.store(true, Ordering::Relaxed);
        std::thread::sleep(grace);
        info!("Exiting");
        std::process::exit(-1);
    }).unwrap();

    let pin = SoftPwmPin::new(args.pin, args.frequency, args.initial_duty)?;
    let mut sweeper = PwmSweeper::new(pin, args.step, args.hold, got_signal)?;
    sweeper.run()?;

    // Dropping the pin releases it back to its original mode.
    drop(sweeper);
    info!("GPIO {} released", args.pin);
    Ok(())
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
    fn test_default_hold_parses() {
        let args = Args::parse_from(["pwm-sweep"]);
        assert_eq!(args.hold, Duration::from_secs(1));
        assert!(Args::try_parse_from(["pwm-sweep", "--hold=-1"]).is_err());
    }
}
