//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::info;

use crate::backend::{BackendProvider, ImageDirectoryProvider};
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::DispatchConnectionHandler;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Service dependencies required to construct the daemon runtime.
pub(crate) struct ServiceDeps<L, P> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) provider: P,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, P, S> {
    pub(crate) services: ServiceDeps<L, P>,
    pub(crate) shutdown: S,
}

/// Runs the daemon using the production collaborators.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            provider: ImageDirectoryProvider,
        },
        shutdown: SystemShutdownSignal,
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, P, S>(plan: LaunchPlan<L, P, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    P: BackendProvider,
    S: ShutdownSignal,
{
    let LaunchPlan { services, shutdown } = plan;
    let ServiceDeps {
        loader,
        reporter,
        provider,
    } = services;

    let daemon = bootstrap_with(&loader, reporter, provider)?;
    info!(
        target: PROCESS_TARGET,
        listen = %daemon.config().listen(),
        "starting event manager runtime"
    );
    let listener = SocketListener::bind(daemon.config().listen())?;
    let handler = Arc::new(DispatchConnectionHandler::new(
        daemon.router(),
        daemon.config().forward_timeout(),
    ));
    let listener_handle = listener.start(handler)?;

    let reason = match shutdown.wait() {
        Ok(reason) => reason,
        Err(error) => {
            listener_handle.shutdown();
            listener_handle.join()?;
            return Err(error.into());
        }
    };
    info!(target: PROCESS_TARGET, %reason, "stopping event manager");
    listener_handle.shutdown();
    listener_handle.join()?;
    info!(
        target: PROCESS_TARGET,
        %reason,
        "shutdown sequence completed"
    );
    Ok(())
}
