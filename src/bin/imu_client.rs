// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::io::BufReader;
use std::net::TcpStream;

use canonical_error::{CanonicalError, unavailable_error};
use clap::Parser;
use env_logger;
use log::info;

use pi_imu_stream::sample_stream::{read_sample, SampleHistory,
                                   DEFAULT_HISTORY_LENGTH};

/// Connects to imu-server and logs the samples it sends.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Server host name or address.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Number of samples kept for the range summary.
    #[arg(long, default_value_t = DEFAULT_HISTORY_LENGTH)]
    history: usize,
}

fn main() -> Result<(), CanonicalError> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let stream = TcpStream::connect((args.host.as_str(), args.port))
        .map_err(|e| unavailable_error(
            &format!("Failed to connect to {}:{}: {}", args.host, args.port, e)))?;
    info!("Connected to {}:{}", args.host, args.port);
    let mut reader = BufReader::new(stream);

    let mut history = SampleHistory::new(args.history);
    let mut count = 0;
    while let Some(sample) = read_sample(&mut reader)? {
        info!("Accel (m/s²): ax={:.4} ay={:.4} az={:.4}  Gyro (°/s): gx={:.4} gy={:.4} gz={:.4}",
              sample.accel.x, sample.accel.y, sample.accel.z,
              sample.gyro.x, sample.gyro.y, sample.gyro.z);
        history.push(sample);
        count += 1;
        if count % 20 == 0 {
            if let Some(ranges) = history.ranges() {
                let names = ["ax", "ay", "az", "gx", "gy", "gz"];
                for (name, (min, max)) in names.iter().zip(ranges) {
                    info!("Last {} samples: {} in [{:.4}, {:.4}]",
                          history.len(), name, min, max);
                }
            }
        }
    }
    info!("Server closed the stream after {} samples", count);
    Ok(())
}
