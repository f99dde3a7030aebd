//! Command dispatch for the Event Manager.
//!
//! The [`Router`] owns the module and connection registries and interprets
//! each command frame. Outputs produced by module invocations are routed by
//! a bounded fan-out, delivering to local modules directly and queueing
//! `RemoteOutput` frames for remote Event Managers.

mod entries;
mod errors;
mod fanout;
mod handler;
mod outputs;
mod router;

pub use self::errors::{DispatchError, OutputBatchError};
pub(crate) use self::handler::DispatchConnectionHandler;
pub use self::outputs::{Output, decode_output_batch};
pub use self::router::{Delivery, Dispatch, FollowUp, Forward, Router};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
