//! Seam to the secure-execution environment.
//!
//! The daemon never talks to a TEE directly. It installs module images and
//! invokes entry points through [`SecureBackend`], handing each invocation a
//! four-slot [`Operation`] whose parameter directions are fixed per entry.

mod image_dir;
mod operation;

use std::fmt;
use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use eventmgr_config::Config;
use eventmgr_wire::ModuleUuid;
use thiserror::Error;

pub use image_dir::ImageDirectoryBackend;
pub use operation::{Operation, PARAM_COUNT, Param};

/// Maximum number of outputs one invocation may emit.
pub const MAX_OUTPUTS: usize = 32;

/// Capacity of the shared in/out data buffer handed to user and input entries.
pub const DATA_BUFFER_LEN: usize = 64 * 1024;

/// Opaque handle to an open module session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    /// Wraps a backend-specific session identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Backend-specific session identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "session#{}", self.0)
    }
}

/// Command identifiers understood by every secure module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryId {
    /// Provision a connection key.
    SetKey,
    /// Authenticate a challenge.
    Attest,
    /// Disable the module.
    Disable,
    /// Consume an encrypted input for a connection.
    HandleInput,
    /// Run a module-defined entry point; its index travels in the value slot.
    User,
}

impl EntryId {
    /// Command identifier passed to the secure world.
    #[must_use]
    pub const fn command_id(self) -> u32 {
        match self {
            Self::SetKey => 0,
            Self::Attest => 1,
            Self::Disable => 2,
            Self::HandleInput => 3,
            Self::User => 4,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::SetKey => "set_key",
            Self::Attest => "attest",
            Self::Disable => "disable",
            Self::HandleInput => "handle_input",
            Self::User => "user",
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Failures reported by a [`SecureBackend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// Writing the module image failed.
    #[error("failed to write module image '{path}': {source}")]
    Image {
        /// Destination of the image.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The secure world refused to open a session.
    #[error("failed to open a session to module {uuid}: {message}")]
    Session {
        /// Module being opened.
        uuid: ModuleUuid,
        /// Backend diagnostic.
        message: String,
    },
    /// An invocation returned a failure code.
    #[error("{entry} invocation failed with code {code:#010x}")]
    Invoke {
        /// Entry point invoked.
        entry: EntryId,
        /// Backend result code.
        code: u32,
    },
}

/// Secure-execution environment hosting the modules.
pub trait SecureBackend: Send + Sync {
    /// Installs `image` for `uuid` and opens a session to it.
    fn install(&self, uuid: &ModuleUuid, image: &[u8]) -> Result<SessionHandle, BackendError>;

    /// Invokes `entry` on `session`. Output and in/out parameters are
    /// updated in place.
    fn invoke(
        &self,
        session: SessionHandle,
        entry: EntryId,
        operation: &mut Operation,
    ) -> Result<(), BackendError>;

    /// Releases a session dropped by a reset.
    fn close(&self, session: SessionHandle);
}

/// Builds the backend a daemon runs against once configuration is known.
pub trait BackendProvider {
    /// Creates the backend for `config`.
    fn provide(&self, config: &Config) -> Arc<dyn SecureBackend>;
}

impl<F> BackendProvider for F
where
    F: Fn(&Config) -> Arc<dyn SecureBackend>,
{
    fn provide(&self, config: &Config) -> Arc<dyn SecureBackend> {
        self(config)
    }
}

/// Provider that installs images into the configured module directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDirectoryProvider;

impl BackendProvider for ImageDirectoryProvider {
    fn provide(&self, config: &Config) -> Arc<dyn SecureBackend> {
        Arc::new(ImageDirectoryBackend::new(config.module_dir()))
    }
}
