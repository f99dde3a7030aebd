//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use eventmgr_config::Config;

use crate::backend::BackendError;
use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::registry::ModuleSession;

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn module_loaded(&self, module: &ModuleSession) {
        self.record(HealthEvent::ModuleLoaded(module.module_id));
    }

    fn module_load_failed(&self, module_id: u16, _error: &BackendError) {
        self.record(HealthEvent::ModuleLoadFailed(module_id));
    }

    fn registries_reset(&self, modules: usize, connections: usize) {
        self.record(HealthEvent::RegistriesReset {
            modules,
            connections,
        });
    }
}

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// A module was registered.
    ModuleLoaded(u16),
    /// Installing a module failed.
    ModuleLoadFailed(u16),
    /// Both registries were cleared.
    RegistriesReset {
        /// Sessions dropped.
        modules: usize,
        /// Routes dropped.
        connections: usize,
    },
}
