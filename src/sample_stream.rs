// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::collections::VecDeque;
use std::io::BufRead;

use canonical_error::{CanonicalError, invalid_argument_error,
                      unavailable_error};

use crate::imu_trait::SensorReading;

pub const DEFAULT_HISTORY_LENGTH: usize = 200;

/// One line of the sensor stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    pub accel: SensorReading,
    pub gyro: SensorReading,
}

impl ImuSample {
    /// Parses `ax,ay,az,gx,gy,gz`, with or without the trailing newline.
    pub fn parse(line: &str) -> Result<ImuSample, CanonicalError> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() != 6 {
            return Err(invalid_argument_error(
                &format!("Expected 6 fields, got {}: {:?}", fields.len(), line)));
        }
        let mut values = [0.0; 6];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field.trim().parse()
                .map_err(|e| invalid_argument_error(
                    &format!("Bad field {:?}: {}", field, e)))?;
        }
        Ok(ImuSample {
            accel: SensorReading::new(values[0], values[1], values[2]),
            gyro: SensorReading::new(values[3], values[4], values[5]),
        })
    }

    fn channels(&self) -> [f64; 6] {
        [self.accel.x, self.accel.y, self.accel.z,
         self.gyro.x, self.gyro.y, self.gyro.z]
    }
}

/// Reads the next sample from a stream. Returns None at end of stream.
pub fn read_sample<R: BufRead>(reader: &mut R)
                               -> Result<Option<ImuSample>, CanonicalError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)
        .map_err(|e| unavailable_error(&format!("Failed to read stream: {}", e)))?;
    if n == 0 {
        return Ok(None);
    }
    ImuSample::parse(&line).map(Some)
}

/// Fixed length rolling history of samples; once full, each new sample
/// evicts the oldest.
pub struct SampleHistory {
    capacity: usize,
    samples: VecDeque<ImuSample>,
}

impl SampleHistory {
    pub fn new(capacity: usize) -> Self {
        SampleHistory {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: ImuSample) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    // Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ImuSample> {
        self.samples.iter()
    }

    /// Per channel (min, max) over the history, in ax,ay,az,gx,gy,gz order.
    /// None if the history is empty.
    pub fn ranges(&self) -> Option<[(f64, f64); 6]> {
        let first = self.samples.front()?.channels();
        let mut ranges = first.map(|v| (v, v));
        for sample in self.samples.iter().skip(1) {
            for (range, v) in ranges.iter_mut().zip(sample.channels()) {
                range.0 = range.0.min(v);
                range.1 = range.1.max(v);
            }
        }
        Some(ranges)
    }
}

impl Default for SampleHistory {
    fn default() -> Self {
        SampleHistory::new(DEFAULT_HISTORY_LENGTH)
    }
}
