//! Outbound delivery of outputs to remote Event Managers.
//!
//! Each forward opens a fresh TCP connection, writes one `RemoteOutput`
//! command frame and closes without waiting for a reply.

use std::io;
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

use eventmgr_wire::{CommandFrame, FrameError};
use thiserror::Error;
use tracing::debug;

/// Target for routing log events.
pub(crate) const ROUTING_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::routing");

/// Failures while forwarding an output.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The remote Event Manager could not be reached.
    #[error("failed to connect to {destination}: {source}")]
    Connect {
        /// Remote address.
        destination: SocketAddrV4,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Configuring the socket failed.
    #[error("failed to configure connection to {destination}: {source}")]
    Configure {
        /// Remote address.
        destination: SocketAddrV4,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the frame failed.
    #[error("failed to send frame to {destination}: {source}")]
    Send {
        /// Remote address.
        destination: SocketAddrV4,
        /// Underlying framing error.
        #[source]
        source: FrameError,
    },
}

/// Sends command frames to remote Event Managers.
pub trait Forwarder: Send + Sync {
    /// Delivers `frame` to `destination` once.
    fn forward(&self, destination: SocketAddrV4, frame: &CommandFrame) -> Result<(), ForwardError>;
}

/// Forwarder that opens a TCP connection per frame.
#[derive(Debug, Clone, Copy)]
pub struct TcpForwarder {
    timeout: Duration,
}

impl TcpForwarder {
    /// Builds a forwarder bounding connect and write by `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Forwarder for TcpForwarder {
    fn forward(&self, destination: SocketAddrV4, frame: &CommandFrame) -> Result<(), ForwardError> {
        let mut stream = TcpStream::connect_timeout(&SocketAddr::V4(destination), self.timeout)
            .map_err(|source| ForwardError::Connect {
                destination,
                source,
            })?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|source| ForwardError::Configure {
                destination,
                source,
            })?;
        frame
            .write_to(&mut stream)
            .map_err(|source| ForwardError::Send {
                destination,
                source,
            })?;
        if let Err(error) = stream.shutdown(Shutdown::Both) {
            debug!(
                target: ROUTING_TARGET,
                %destination,
                error = %error,
                "forward connection already closed"
            );
        }
        Ok(())
    }
}
