//! Test doubles and harnesses shared by the behavioural suites.

mod backend;
mod config_loader;
mod forwarder;
mod harness;
mod reporter;

pub use backend::{Invocation, ScriptedBackend, ScriptedReply};
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use forwarder::RecordingForwarder;
pub use harness::{Harness, sample_uuid};
pub use reporter::{HealthEvent, RecordingHealthReporter};
