//! Configuration for the secure-module Event Manager.
//!
//! Values are layered with `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path`), then `EVENTMGR_*` environment
//! variables, then command-line flags. The daemon consumes the resulting
//! [`Config`] once at bootstrap; nothing reloads it afterwards.

mod defaults;
mod logging;
mod socket;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_FORWARD_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_HOPS,
    DEFAULT_MODULE_DIR, DEFAULT_PORT, default_forward_timeout_ms, default_listen_endpoint,
    default_log_filter, default_log_filter_string, default_log_format, default_max_hops,
    default_module_dir,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketResolveError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "EVENTMGR")]
pub struct Config {
    /// Endpoint the command server accepts connections on.
    #[serde(default = "default_listen_endpoint")]
    #[ortho_config(default = default_listen_endpoint())]
    pub listen: SocketEndpoint,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log rendering.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Directory secure-module images are written to on `LoadModule`.
    #[serde(default = "default_module_dir")]
    #[ortho_config(default = default_module_dir())]
    pub module_dir: Utf8PathBuf,
    /// Connect and write timeout for outbound `RemoteOutput` forwarding.
    #[serde(default = "default_forward_timeout_ms")]
    #[ortho_config(default = DEFAULT_FORWARD_TIMEOUT_MS)]
    pub forward_timeout_ms: u64,
    /// Upper bound on local deliveries performed by one output fan-out.
    #[serde(default = "default_max_hops")]
    #[ortho_config(default = DEFAULT_MAX_HOPS)]
    pub max_hops: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            module_dir: default_module_dir(),
            forward_timeout_ms: DEFAULT_FORWARD_TIMEOUT_MS,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is the program name, as with [`std::env::args_os`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Rejects values that would make the daemon unusable.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_hops == 0 {
            return Err(ConfigValidationError::ZeroHops);
        }
        if self.forward_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroForwardTimeout);
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigValidationError::EmptyLogFilter);
        }
        Ok(())
    }

    /// Command server endpoint.
    #[must_use]
    pub fn listen(&self) -> &SocketEndpoint {
        &self.listen
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log rendering.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Secure-module image directory.
    #[must_use]
    pub fn module_dir(&self) -> &Utf8Path {
        self.module_dir.as_path()
    }

    /// Outbound forwarding timeout.
    #[must_use]
    pub const fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }

    /// Fan-out hop bound.
    #[must_use]
    pub const fn max_hops(&self) -> u32 {
        self.max_hops
    }
}

/// Reasons a loaded configuration is refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// A fan-out could never deliver anything.
    #[error("max_hops must be at least 1")]
    ZeroHops,
    /// Forwarding would time out immediately.
    #[error("forward_timeout_ms must be at least 1")]
    ZeroForwardTimeout,
    /// No log filter was supplied.
    #[error("log_filter must not be empty")]
    EmptyLogFilter,
}
