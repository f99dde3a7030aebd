//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use eventmgr_config::Config;

use crate::backend::BackendError;
use crate::bootstrap::BootstrapError;
use crate::registry::ModuleSession;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a module has been installed and registered.
    fn module_loaded(&self, module: &ModuleSession);

    /// Invoked when installing a module fails.
    fn module_load_failed(&self, module_id: u16, error: &BackendError);

    /// Invoked after a reset dropped every session and route.
    fn registries_reset(&self, modules: usize, connections: usize);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn module_loaded(&self, module: &ModuleSession) {
        (**self).module_loaded(module);
    }

    fn module_load_failed(&self, module_id: u16, error: &BackendError) {
        (**self).module_load_failed(module_id, error);
    }

    fn registries_reset(&self, modules: usize, connections: usize) {
        (**self).registries_reset(modules, connections);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting event manager bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen = %config.listen(),
            module_dir = %config.module_dir(),
            max_hops = config.max_hops(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "event manager bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "event manager bootstrap failed"
        );
    }

    fn module_loaded(&self, module: &ModuleSession) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "module_loaded",
            module_id = module.module_id,
            uuid = %module.uuid,
            session = %module.session,
            "module loaded"
        );
    }

    fn module_load_failed(&self, module_id: u16, error: &BackendError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "module_load_failed",
            module_id,
            error = %error,
            "module failed to load"
        );
    }

    fn registries_reset(&self, modules: usize, connections: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "registries_reset",
            modules,
            connections,
            "module and connection registries cleared"
        );
    }
}
