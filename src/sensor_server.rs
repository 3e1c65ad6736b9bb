// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::Duration;

use canonical_error::{CanonicalError, failed_precondition_error,
                      unavailable_error};
use log::{debug, info, warn};

use crate::imu_trait::{ImuTrait, SensorReading};
use crate::relative_imu::RelativeImu;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Listening,
    Connected,
    Streaming,
    Closed,
}

/// Streams relative IMU readings to a single TCP client, one text line per
/// sample:
///
///   ax,ay,az,gx,gy,gz\n
///
/// with four decimals per field. Acceleration is m/s², angular rate is
/// degrees/second, both relative to the first sample taken after the client
/// connected.
///
/// Only one connection is ever served. When it ends, for any reason, the
/// listening socket is closed too and the server stays Closed.
pub struct SensorServer {
    listener: Option<TcpListener>,
    interval: Duration,
    got_signal: Arc<AtomicBool>,
    state: ServerState,
}

impl SensorServer {
    pub fn bind<A: ToSocketAddrs>(addr: A, interval: Duration,
                                  got_signal: Arc<AtomicBool>)
                                  -> Result<Self, CanonicalError> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| unavailable_error(
                &format!("Failed to bind listening socket: {}", e)))?;
        if let Ok(local_addr) = listener.local_addr() {
            info!("Server listening on {}", local_addr);
        }
        Ok(SensorServer {
            listener: Some(listener),
            interval,
            got_signal,
            state: ServerState::Listening,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, CanonicalError> {
        match &self.listener {
            Some(listener) => listener.local_addr()
                .map_err(|e| unavailable_error(&format!("{}", e))),
            None => Err(failed_precondition_error("Server is closed")),
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Blocks until one client connects, then streams samples from `imu`
    /// until the client goes away, a read fails, or a signal is received.
    /// Returns Ok only for the signal case.
    pub fn serve<I: ImuTrait>(&mut self, imu: I) -> Result<(), CanonicalError> {
        let listener = self.listener.as_ref().ok_or_else(
            || failed_precondition_error("Server is closed"))?;
        let accepted = listener.accept();
        let (mut stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                self.close(None);
                return Err(unavailable_error(
                    &format!("Failed to accept connection: {}", e)));
            }
        };
        info!("Connected by {}", peer);
        self.state = ServerState::Connected;

        info!("Streaming from {}", imu.get_model());
        let mut relative_imu = RelativeImu::new(imu);
        self.state = ServerState::Streaming;
        let result = self.stream_samples(&mut relative_imu, &mut stream);
        match &result {
            Ok(()) => info!("Closing connection to {}", peer),
            Err(e) => warn!("Closing connection to {}: {:?}", peer, e),
        }
        self.close(Some(stream));
        result
    }

    fn stream_samples<I: ImuTrait, W: Write>(&self, imu: &mut RelativeImu<I>,
                                             out: &mut W)
                                             -> Result<(), CanonicalError> {
        loop {
            if self.got_signal.load(Ordering::Relaxed) {
                info!("Got signal, stopping stream");
                return Ok(());
            }
            let accel = imu.read_relative_accel(/*in_g=*/false)?;
            let gyro = imu.read_relative_gyro()?;
            let line = format_sample(&accel, &gyro);
            debug!("Sending {}", line.trim_end());
            out.write_all(line.as_bytes())
                .map_err(|e| unavailable_error(
                    &format!("Failed to send data to client: {}", e)))?;
            sleep(self.interval);
        }
    }

    fn close(&mut self, stream: Option<TcpStream>) {
        if let Some(stream) = stream {
            // The peer may already be gone.
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.listener = None;
        self.state = ServerState::Closed;
    }
}

/// Formats one sample as a wire line, newline included.
pub fn format_sample(accel: &SensorReading, gyro: &SensorReading) -> String {
    format!("{:.4},{:.4},{:.4},{:.4},{:.4},{:.4}\n",
            accel.x, accel.y, accel.z, gyro.x, gyro.y, gyro.z)
}
