//! Termination signals that stop the relay.
//!
//! Every stop signal is handled the same way: the listener stops
//! accepting, in-flight connections finish on their own threads, and the
//! launch sequence returns. The signal that triggered the stop is reported
//! back so the exit can be logged with its cause.

use std::ffi::c_int;
use std::fmt;
use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;

/// Signals that stop the relay.
pub const STOP_SIGNALS: [c_int; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Why the relay is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// One of [`STOP_SIGNALS`] arrived.
    Signal(c_int),
    /// The embedding code asked for a stop without a signal.
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Signal(signal) => match signal_name(signal) {
                Some(name) => formatter.write_str(name),
                None => write!(formatter, "signal {signal}"),
            },
            Self::Requested => formatter.write_str("requested"),
        }
    }
}

/// Source of the relay's stop request.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until the relay should stop.
    fn wait(&self) -> Result<StopReason, ShutdownError>;
}

/// Failures while waiting for a stop request.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Registering the signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The signal stream ended without delivering a stop signal.
    #[error("signal stream closed before a stop signal arrived")]
    Closed,
}

/// Waits for one of [`STOP_SIGNALS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<StopReason, ShutdownError> {
        let mut signals =
            Signals::new(STOP_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        signals
            .forever()
            .next()
            .map(StopReason::Signal)
            .ok_or(ShutdownError::Closed)
    }
}

const fn signal_name(signal: c_int) -> Option<&'static str> {
    match signal {
        SIGTERM => Some("SIGTERM"),
        SIGINT => Some("SIGINT"),
        SIGQUIT => Some("SIGQUIT"),
        SIGHUP => Some("SIGHUP"),
        _ => None,
    }
}
