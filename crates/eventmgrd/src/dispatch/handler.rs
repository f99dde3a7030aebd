//! Connection handler serving one command per connection.

use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use eventmgr_wire::CommandFrame;
use tracing::{debug, warn};

use crate::transport::ConnectionHandler;

use super::DISPATCH_TARGET;
use super::router::{Dispatch, Router};

/// Reads one command, writes its result and then runs the follow-up.
///
/// The result reaches the client before any deferred delivery or remote
/// forward starts, so a module answering a `RemoteOutput` never waits on
/// the sender's connection. Reads and writes on the client stream are
/// bounded by `io_timeout`, so a stalled peer only holds its thread that
/// long.
pub(crate) struct DispatchConnectionHandler {
    router: Arc<Router>,
    io_timeout: Duration,
}

impl DispatchConnectionHandler {
    pub(crate) const fn new(router: Arc<Router>, io_timeout: Duration) -> Self {
        Self { router, io_timeout }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, mut stream: TcpStream) {
        let timeout = Some(self.io_timeout);
        if let Err(error) = stream
            .set_read_timeout(timeout)
            .and_then(|()| stream.set_write_timeout(timeout))
        {
            warn!(
                target: DISPATCH_TARGET,
                error = %error,
                "refusing connection without stream timeouts"
            );
            return;
        }
        let command = match CommandFrame::read_from(&mut stream) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "peer closed before sending a command");
                return;
            }
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    error = %error,
                    "dropping connection after framing error"
                );
                return;
            }
        };

        let Dispatch { result, follow_up } = self.router.dispatch(&command);
        if let Err(error) = result.write_to(&mut stream) {
            warn!(
                target: DISPATCH_TARGET,
                error = %error,
                "failed to write result"
            );
        }
        if let Err(error) = stream.shutdown(Shutdown::Both) {
            debug!(
                target: DISPATCH_TARGET,
                error = %error,
                "connection already closed"
            );
        }
        drop(stream);
        self.router.complete(follow_up);
    }
}
