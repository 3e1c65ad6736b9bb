// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::iter::{Chain, Cycle, Rev, StepBy};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::Duration;

use canonical_error::{CanonicalError, internal_error,
                      invalid_argument_error, unavailable_error};
use log::{info, warn};
use rppal::gpio::{Gpio, OutputPin};

pub const DEFAULT_PIN: u8 = 13;
pub const DEFAULT_FREQUENCY_HZ: f64 = 1.0;
pub const DEFAULT_INITIAL_DUTY: u8 = 50;
pub const DEFAULT_STEP: u8 = 10;
pub const DEFAULT_HOLD: Duration = Duration::from_secs(1);

/// A PWM-capable output. Duty cycle is in percent, 0..=100.
pub trait PwmOutput {
    fn set_duty_cycle(&mut self, percent: u8) -> Result<(), CanonicalError>;

    // Stops PWM output and releases the output.
    fn stop(&mut self) -> Result<(), CanonicalError>;
}

/// Software PWM on a Raspberry Pi GPIO pin (BCM numbering). When the pin is
/// dropped it reverts to the mode it had before we took it over.
pub struct SoftPwmPin {
    pin: OutputPin,
    frequency_hz: f64,
}

impl SoftPwmPin {
    pub fn new(bcm_pin: u8, frequency_hz: f64, initial_duty: u8)
               -> Result<Self, CanonicalError> {
        let gpio = Gpio::new()
            .map_err(|e| unavailable_error(
                &format!("Failed to initialize GPIO: {:?}", e)))?;
        let pin = gpio.get(bcm_pin)
            .map_err(|e| unavailable_error(
                &format!("Failed to get GPIO pin {}: {:?}", bcm_pin, e)))?
            .into_output_low();
        let mut soft_pwm = SoftPwmPin { pin, frequency_hz };
        soft_pwm.set_duty_cycle(initial_duty)?;
        info!("PWM started on GPIO {} at {}Hz, {}% duty cycle",
              bcm_pin, frequency_hz, initial_duty);
        Ok(soft_pwm)
    }
}

impl PwmOutput for SoftPwmPin {
    fn set_duty_cycle(&mut self, percent: u8) -> Result<(), CanonicalError> {
        if percent > 100 {
            return Err(invalid_argument_error(
                &format!("Duty cycle {}% out of range", percent)));
        }
        self.pin.set_pwm_frequency(self.frequency_hz, percent as f64 / 100.0)
            .map_err(|e| internal_error(
                &format!("Failed to set duty cycle: {:?}", e)))
    }

    fn stop(&mut self) -> Result<(), CanonicalError> {
        self.pin.clear_pwm()
            .map_err(|e| internal_error(
                &format!("Failed to stop PWM: {:?}", e)))?;
        self.pin.set_low();
        Ok(())
    }
}

type SweepIter = Cycle<Chain<StepBy<RangeInclusive<u8>>,
                             StepBy<Rev<RangeInclusive<u8>>>>>;

/// Endless sequence of duty cycles ramping from 0 up to 100 and back down in
/// fixed steps. Both ends are repeated at the turnaround: with a step of 10
/// the sequence is 0, 10, ..., 100, 100, 90, ..., 0, 0, 10, ...
pub struct DutyCycleSweep {
    values: SweepIter,
}

impl DutyCycleSweep {
    pub fn new(step: u8) -> Result<Self, CanonicalError> {
        if step == 0 || step > 100 {
            return Err(invalid_argument_error(
                &format!("Step {} must be in 1..=100", step)));
        }
        let step = step as usize;
        let up = (0..=100u8).step_by(step);
        let down = (0..=100u8).rev().step_by(step);
        Ok(DutyCycleSweep { values: up.chain(down).cycle() })
    }
}

impl Iterator for DutyCycleSweep {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        self.values.next()
    }
}

/// Open loop duty cycle sweeper. Runs until `got_signal` is set, then stops
/// the output.
pub struct PwmSweeper<P: PwmOutput> {
    output: P,
    sweep: DutyCycleSweep,
    hold: Duration,
    got_signal: Arc<AtomicBool>,
}

impl<P: PwmOutput> PwmSweeper<P> {
    pub fn new(output: P, step: u8, hold: Duration, got_signal: Arc<AtomicBool>)
               -> Result<Self, CanonicalError> {
        Ok(PwmSweeper {
            output,
            sweep: DutyCycleSweep::new(step)?,
            hold,
            got_signal,
        })
    }

    /// Sweeps until signalled. The output is stopped on the way out whether
    /// the sweep ended by signal or by error.
    pub fn run(&mut self) -> Result<(), CanonicalError> {
        let result = self.sweep_until_signal();
        if let Err(e) = &result {
            warn!("Sweep failed: {:?}", e);
        }
        let stop_result = self.output.stop();
        info!("PWM stopped");
        result.and(stop_result)
    }

    fn sweep_until_signal(&mut self) -> Result<(), CanonicalError> {
        while !self.got_signal.load(Ordering::Relaxed) {
            let Some(duty) = self.sweep.next() else {
                break;
            };
            self.output.set_duty_cycle(duty)?;
            info!("PWM Duty Cycle: {}%", duty);
            sleep(self.hold);
        }
        Ok(())
    }

    pub fn into_output(self) -> P {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Duty(u8),
        Stop,
    }

    // Records calls and raises the signal after `signal_after` duty changes.
    struct RecordingPwm {
        calls: Vec<Call>,
        signal_after: usize,
        fail_at: Option<usize>,
        got_signal: Arc<AtomicBool>,
    }

    impl PwmOutput for RecordingPwm {
        fn set_duty_cycle(&mut self, percent: u8) -> Result<(), CanonicalError> {
            if self.fail_at == Some(self.calls.len()) {
                return Err(internal_error("pin fault"));
            }
            self.calls.push(Call::Duty(percent));
            if self.calls.len() >= self.signal_after {
                self.got_signal.store(true, Ordering::Relaxed);
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), CanonicalError> {
            self.calls.push(Call::Stop);
            Ok(())
        }
    }

    fn make_sweeper(signal_after: usize, fail_at: Option<usize>)
                    -> PwmSweeper<RecordingPwm> {
        let got_signal = Arc::new(AtomicBool::new(false));
        let output = RecordingPwm {
            calls: Vec::new(),
            signal_after,
            fail_at,
            got_signal: got_signal.clone(),
        };
        PwmSweeper::new(output, 10, Duration::ZERO, got_signal).unwrap()
    }

    #[test]
    fn test_sweep_sequence() {
        let values: Vec<u8> = DutyCycleSweep::new(10).unwrap().take(24).collect();
        assert_eq!(values, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100,
                                100, 90, 80, 70, 60, 50, 40, 30, 20, 10, 0,
                                0, 10]);
    }

    #[test]
    fn test_uneven_step() {
        let values: Vec<u8> = DutyCycleSweep::new(30).unwrap().take(9).collect();
        assert_eq!(values, vec![0, 30, 60, 90, 100, 70, 40, 10, 0]);
    }

    #[test]
    fn test_bad_step() {
        assert!(DutyCycleSweep::new(0).is_err());
        assert!(DutyCycleSweep::new(101).is_err());
    }

    #[test]
    fn test_stop_follows_signal() {
        let mut sweeper = make_sweeper(25, None);
        sweeper.run().unwrap();
        let calls = sweeper.into_output().calls;
        assert_eq!(calls.len(), 26);
        assert_eq!(calls[0], Call::Duty(0));
        assert_eq!(calls[10], Call::Duty(100));
        assert_eq!(calls[11], Call::Duty(100));
        assert_eq!(calls[21], Call::Duty(0));
        assert_eq!(calls[22], Call::Duty(0));
        assert_eq!(calls[24], Call::Duty(20));
        assert_eq!(calls[25], Call::Stop);
    }

    #[test]
    fn test_stop_after_error() {
        let mut sweeper = make_sweeper(100, Some(3));
        assert!(sweeper.run().is_err());
        let calls = sweeper.into_output().calls;
        assert_eq!(calls, vec![Call::Duty(0), Call::Duty(10), Call::Duty(20),
                               Call::Stop]);
    }
}
