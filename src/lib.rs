// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

pub mod imu6500;
pub mod imu_trait;
pub mod pwm_sweeper;
pub mod register_bus;
pub mod relative_imu;
pub mod sample_stream;
pub mod sensor_server;
