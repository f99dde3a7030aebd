//! Backend that installs module images into a directory on disk.
//!
//! This covers the host half of module installation: the image is written
//! to `<module_dir>/<uuid>.ta` where the TEE supplicant looks for it.
//! Sessions are bookkeeping only. Invocations succeed without emitting
//! outputs, and `Attest` answers with an all-zero MAC, which matches a
//! host without a secure world.

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use eventmgr_wire::ModuleUuid;
use tracing::debug;

use super::{BackendError, EntryId, Operation, Param, SecureBackend, SessionHandle};

const BACKEND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::backend");

/// Writes images to a module directory and hands out session handles.
#[derive(Debug)]
pub struct ImageDirectoryBackend {
    module_dir: Utf8PathBuf,
    next_session: AtomicU64,
}

impl ImageDirectoryBackend {
    /// Creates a backend installing into `module_dir`.
    #[must_use]
    pub fn new(module_dir: &Utf8Path) -> Self {
        Self {
            module_dir: module_dir.to_path_buf(),
            next_session: AtomicU64::new(1),
        }
    }

    /// Path the image for `uuid` is written to.
    #[must_use]
    pub fn image_path(&self, uuid: &ModuleUuid) -> Utf8PathBuf {
        self.module_dir.join(uuid.image_file_name())
    }
}

impl SecureBackend for ImageDirectoryBackend {
    fn install(&self, uuid: &ModuleUuid, image: &[u8]) -> Result<SessionHandle, BackendError> {
        let path = self.image_path(uuid);
        fs::write(&path, image).map_err(|source| BackendError::Image {
            path: path.clone(),
            source,
        })?;
        let session = SessionHandle::new(self.next_session.fetch_add(1, Ordering::Relaxed));
        debug!(
            target: BACKEND_TARGET,
            %uuid,
            %path,
            image_len = image.len(),
            %session,
            "module image installed"
        );
        Ok(session)
    }

    fn invoke(
        &self,
        session: SessionHandle,
        entry: EntryId,
        operation: &mut Operation,
    ) -> Result<(), BackendError> {
        debug!(target: BACKEND_TARGET, %session, %entry, "invocation");
        match entry {
            EntryId::User | EntryId::HandleInput => {
                // Report zero outputs.
                if let Some(Param::Value { b, .. }) = operation.param_mut(0) {
                    *b = 0;
                }
            }
            EntryId::Attest => {
                if let Some(mac) = operation.param_mut(1).and_then(Param::writable) {
                    mac.fill(0);
                }
            }
            EntryId::SetKey | EntryId::Disable => {}
        }
        Ok(())
    }

    fn close(&self, session: SessionHandle) {
        debug!(target: BACKEND_TARGET, %session, "session closed");
    }
}
