// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use canonical_error::{CanonicalError, internal_error,
                      invalid_argument_error, unavailable_error};
use rppal::i2c::I2c;

/// Byte-addressed register access to one device on an I2C bus. The device
/// address is bound when the bus is opened.
pub trait RegisterBus {
    fn read_byte(&mut self, register: u8) -> Result<u8, CanonicalError>;
    fn write_byte(&mut self, register: u8, value: u8)
                  -> Result<(), CanonicalError>;
}

/// RegisterBus on a Raspberry Pi I2C peripheral, using SMBus byte transfers.
pub struct I2cRegisterBus {
    i2c: I2c,
}

impl I2cRegisterBus {
    pub fn new(bus: u8, device_address: u16) -> Result<Self, CanonicalError> {
        let mut i2c = I2c::with_bus(bus)
            .map_err(|e| unavailable_error(
                &format!("Failed to initialize I2C bus {}: {:?}", bus, e)))?;
        i2c.set_slave_address(device_address)
            .map_err(|e| invalid_argument_error(
                &format!("Failed to set I2C slave address 0x{:02X}: {:?}",
                         device_address, e)))?;
        Ok(I2cRegisterBus { i2c })
    }
}

impl RegisterBus for I2cRegisterBus {
    fn read_byte(&mut self, register: u8) -> Result<u8, CanonicalError> {
        self.i2c.smbus_read_byte(register)
            .map_err(|e| internal_error(
                &format!("Failed to read register 0x{:02X}: {:?}", register, e)))
    }

    fn write_byte(&mut self, register: u8, value: u8)
                  -> Result<(), CanonicalError> {
        self.i2c.smbus_write_byte(register, value)
            .map_err(|e| internal_error(
                &format!("Failed to write register 0x{:02X}: {:?}", register, e)))
    }
}

#[cfg(test)]
pub mod fake {
    use std::collections::VecDeque;

    use canonical_error::{CanonicalError, internal_error};

    use super::RegisterBus;

    /// In-memory register file. Queued frames are applied when
    /// `frame_register` is read, so a driver that reads that register first
    /// sees one frame per sample.
    pub struct FakeRegisterBus {
        pub registers: [u8; 256],
        pub writes: Vec<(u8, u8)>,
        frames: VecDeque<Vec<(u8, u8)>>,
        frame_register: u8,
        // Reads left before every access fails; None for never.
        reads_until_failure: Option<usize>,
    }

    impl FakeRegisterBus {
        pub fn new(frame_register: u8) -> Self {
            FakeRegisterBus {
                registers: [0; 256],
                writes: Vec::new(),
                frames: VecDeque::new(),
                frame_register,
                reads_until_failure: None,
            }
        }

        pub fn set_word(&mut self, register: u8, value: i16) {
            let [high, low] = value.to_be_bytes();
            self.registers[register as usize] = high;
            self.registers[register as usize + 1] = low;
        }

        pub fn push_frame(&mut self, words: &[(u8, i16)]) {
            let mut frame = Vec::new();
            for &(register, value) in words {
                let [high, low] = value.to_be_bytes();
                frame.push((register, high));
                frame.push((register + 1, low));
            }
            self.frames.push_back(frame);
        }

        pub fn fail_after_reads(&mut self, reads: usize) {
            self.reads_until_failure = Some(reads);
        }
    }

    impl RegisterBus for FakeRegisterBus {
        fn read_byte(&mut self, register: u8) -> Result<u8, CanonicalError> {
            match self.reads_until_failure {
                Some(0) => return Err(internal_error("bus fault")),
                Some(n) => self.reads_until_failure = Some(n - 1),
                None => {}
            }
            if register == self.frame_register {
                if let Some(frame) = self.frames.pop_front() {
                    for (r, v) in frame {
                        self.registers[r as usize] = v;
                    }
                }
            }
            Ok(self.registers[register as usize])
        }

        fn write_byte(&mut self, register: u8, value: u8)
                      -> Result<(), CanonicalError> {
            self.writes.push((register, value));
            self.registers[register as usize] = value;
            Ok(())
        }
    }
}
