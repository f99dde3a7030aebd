//! Recursive routing of module outputs.
//!
//! Outputs are processed depth-first from an explicit worklist. Local
//! routes re-enter a module through its input handler and push whatever
//! that module emits; remote routes are collected as [`Forward`]s for the
//! caller to send. Local deliveries are bounded by the configured hop
//! limit, so a cycle of local routes terminates with an error instead of
//! recursing forever.

use eventmgr_wire::Tag;
use tracing::{debug, warn};

use crate::forward::ROUTING_TARGET;

use super::errors::DispatchError;
use super::outputs::Output;
use super::router::{Delivery, Forward, Router};

pub(super) struct FanOut<'r> {
    router: &'r Router,
    hops: u32,
    forwards: Vec<Forward>,
}

impl<'r> FanOut<'r> {
    pub(super) const fn new(router: &'r Router) -> Self {
        Self {
            router,
            hops: 0,
            forwards: Vec::new(),
        }
    }

    /// Routes outputs emitted by a module invocation.
    pub(super) fn route(mut self, outputs: Vec<Output>) -> Result<Vec<Forward>, DispatchError> {
        self.drain(outputs)?;
        Ok(self.forwards)
    }

    /// Delivers `delivery` to its module, then routes what it emits.
    pub(super) fn deliver(mut self, delivery: &Delivery) -> Result<Vec<Forward>, DispatchError> {
        let outputs = self.invoke_local(
            delivery.module_id,
            delivery.conn_id,
            &delivery.ciphertext,
            &delivery.tag,
        )?;
        self.drain(outputs.unwrap_or_default())?;
        Ok(self.forwards)
    }

    fn drain(&mut self, outputs: Vec<Output>) -> Result<(), DispatchError> {
        let mut pending: Vec<Output> = outputs.into_iter().rev().collect();
        while let Some(output) = pending.pop() {
            let Some(connection) = self.router.connection(output.conn_id)? else {
                warn!(
                    target: ROUTING_TARGET,
                    conn_id = output.conn_id,
                    "dropping output for unknown connection"
                );
                continue;
            };
            if !connection.is_local {
                debug!(
                    target: ROUTING_TARGET,
                    conn_id = connection.conn_id,
                    destination = %connection.remote(),
                    "output queued for remote event manager"
                );
                self.forwards.push(Forward::remote_output(&connection, &output));
                continue;
            }
            let produced = self.invoke_local(
                connection.target_module,
                connection.conn_id,
                &output.ciphertext,
                &output.tag,
            )?;
            if let Some(children) = produced {
                pending.extend(children.into_iter().rev());
            }
        }
        Ok(())
    }

    /// Hands one input to a local module. Failures other than the hop limit
    /// and internal errors drop the input and keep routing.
    fn invoke_local(
        &mut self,
        module_id: u16,
        conn_id: u16,
        ciphertext: &[u8],
        tag: &Tag,
    ) -> Result<Option<Vec<Output>>, DispatchError> {
        let limit = self.router.max_hops();
        if self.hops >= limit {
            return Err(DispatchError::HopLimitExceeded { limit });
        }
        self.hops += 1;
        match self.router.deliver_input(module_id, conn_id, ciphertext, tag) {
            Ok(outputs) => {
                debug!(
                    target: ROUTING_TARGET,
                    module_id,
                    conn_id,
                    outputs = outputs.len(),
                    hop = self.hops,
                    "input delivered to local module"
                );
                Ok(Some(outputs))
            }
            Err(error @ DispatchError::Internal { .. }) => Err(error),
            Err(error) => {
                warn!(
                    target: ROUTING_TARGET,
                    module_id,
                    conn_id,
                    error = %error,
                    "local delivery failed"
                );
                Ok(None)
            }
        }
    }
}
