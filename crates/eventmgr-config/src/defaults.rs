use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Port the Event Manager has historically listened on.
pub const DEFAULT_PORT: u16 = 1236;

/// Address the command server binds to by default.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory secure-module images are installed into by default.
pub const DEFAULT_MODULE_DIR: &str = "/lib/optee_armtz";

/// Default connect and write timeout for outbound forwarding, in milliseconds.
pub const DEFAULT_FORWARD_TIMEOUT_MS: u64 = 5_000;

/// Default bound on local deliveries performed by a single fan-out.
pub const DEFAULT_MAX_HOPS: u32 = 256;

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter, for contexts that need an allocation (serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default log rendering.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default command server endpoint.
#[must_use]
pub fn default_listen_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_HOST, DEFAULT_PORT)
}

/// Default secure-module image directory.
#[must_use]
pub fn default_module_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_MODULE_DIR)
}

/// Default outbound forwarding timeout in milliseconds.
#[must_use]
pub const fn default_forward_timeout_ms() -> u64 {
    DEFAULT_FORWARD_TIMEOUT_MS
}

/// Default fan-out hop bound.
#[must_use]
pub const fn default_max_hops() -> u32 {
    DEFAULT_MAX_HOPS
}
