//! Event Manager daemon for secure-module networks.
//!
//! The daemon accepts one command frame per TCP connection, answers with
//! one result frame and closes. Commands register connections between
//! modules, install module images into the trusted backend and invoke
//! module entry points. Outputs a module emits are routed by connection:
//! local routes are fed straight back into the target module, remote routes
//! are forwarded as `RemoteOutput` frames to the Event Manager on the other
//! side.
//!
//! Bootstrap loads configuration through [`eventmgr_config`], installs
//! structured telemetry and builds the [`Router`]. Health hooks report each
//! lifecycle stage so operators can follow module loads and resets.

pub mod backend;
mod bootstrap;
mod dispatch;
mod forward;
mod health;
mod process;
pub mod registry;
mod telemetry;
mod transport;

pub use backend::{BackendError, BackendProvider, ImageDirectoryProvider, SecureBackend};
pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{
    Delivery, Dispatch, DispatchError, FollowUp, Forward, Output, OutputBatchError, Router,
    decode_output_batch,
};
pub use forward::{ForwardError, Forwarder, TcpForwarder};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, STOP_SIGNALS, ShutdownError, ShutdownSignal, StopReason, SystemShutdownSignal,
    run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
