//! Configuration loaders used by bootstrap and launch tests.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::OrthoError;
use tempfile::TempDir;

use eventmgr_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that listens on an ephemeral loopback port and keeps module
/// images under a temporary directory.
pub struct TestConfigLoader {
    module_dir: TempDir,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let module_dir = TempDir::new().expect("failed to create temporary module directory");
        Self { module_dir }
    }

    fn module_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.module_dir.path().to_path_buf())
            .expect("temporary module directory was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen: SocketEndpoint::tcp("127.0.0.1", 0),
            module_dir: self.module_dir(),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an invalid listen endpoint.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("eventmgrd"),
            OsString::from("--listen"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
