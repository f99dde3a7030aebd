//! Command routing to the registries, the backend and the fan-out engine.
//!
//! [`Router::dispatch`] turns one command into a [`Dispatch`]: the result
//! frame to send back and a [`FollowUp`] holding work that must not delay
//! that reply (deferred `RemoteOutput` delivery and remote forwards). The
//! transport writes the result first and then calls [`Router::complete`].

use std::net::SocketAddrV4;
use std::sync::{Arc, Mutex, MutexGuard};

use eventmgr_wire::payload::{
    AddConnection, AttestArgs, DisableArgs, Entry, EntryCall, LoadModuleHeader, RemoteOutput,
    SetKeyArgs,
};
use eventmgr_wire::{CommandFrame, Opcode, ResultCode, ResultFrame, Tag};
use tracing::{debug, error, info, warn};

use crate::backend::{SecureBackend, SessionHandle};
use crate::forward::{Forwarder, ROUTING_TARGET};
use crate::health::HealthReporter;
use crate::registry::{Connection, ConnectionRegistry, ModuleRegistry, ModuleSession};

use super::DISPATCH_TARGET;
use super::entries;
use super::errors::DispatchError;
use super::fanout::FanOut;
use super::outputs::Output;

/// Encrypted input waiting to be handed to a local module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Module receiving the input.
    pub module_id: u16,
    /// Connection the input arrived on.
    pub conn_id: u16,
    /// Ciphertext.
    pub ciphertext: Vec<u8>,
    /// Authentication tag.
    pub tag: Tag,
}

/// `RemoteOutput` frame bound for another Event Manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forward {
    /// Remote Event Manager.
    pub destination: SocketAddrV4,
    /// Frame to send.
    pub frame: CommandFrame,
}

impl Forward {
    /// Wraps `output` for the remote end of `connection`.
    #[must_use]
    pub fn remote_output(connection: &Connection, output: &Output) -> Self {
        let payload = RemoteOutput {
            module_id: connection.target_module,
            conn_id: connection.conn_id,
            ciphertext: &output.ciphertext,
            tag: output.tag,
        }
        .encode();
        Self {
            destination: connection.remote(),
            frame: CommandFrame::new(Opcode::RemoteOutput, payload),
        }
    }
}

/// Work that runs after the result has been sent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FollowUp {
    delivery: Option<Delivery>,
    forwards: Vec<Forward>,
}

impl FollowUp {
    /// Whether nothing remains to be done.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delivery.is_none() && self.forwards.is_empty()
    }

    /// Deferred local delivery, if any.
    #[must_use]
    pub const fn delivery(&self) -> Option<&Delivery> {
        self.delivery.as_ref()
    }

    /// Remote forwards, in routing order.
    #[must_use]
    pub fn forwards(&self) -> &[Forward] {
        &self.forwards
    }
}

/// Outcome of dispatching one command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Dispatch {
    /// Reply for the client.
    pub result: ResultFrame,
    /// Work to run once the reply is out.
    pub follow_up: FollowUp,
}

struct Reply {
    payload: Vec<u8>,
    follow_up: FollowUp,
}

impl Reply {
    const fn empty() -> Self {
        Self::with_payload(Vec::new())
    }

    const fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            payload,
            follow_up: FollowUp {
                delivery: None,
                forwards: Vec::new(),
            },
        }
    }
}

/// Owns the registries and routes commands and module outputs.
pub struct Router {
    modules: Mutex<ModuleRegistry>,
    connections: Mutex<ConnectionRegistry>,
    backend: Arc<dyn SecureBackend>,
    forwarder: Arc<dyn Forwarder>,
    reporter: Arc<dyn HealthReporter>,
    max_hops: u32,
}

impl Router {
    /// Creates a router with empty registries.
    pub fn new(
        backend: Arc<dyn SecureBackend>,
        forwarder: Arc<dyn Forwarder>,
        reporter: Arc<dyn HealthReporter>,
        max_hops: u32,
    ) -> Self {
        Self {
            modules: Mutex::new(ModuleRegistry::new()),
            connections: Mutex::new(ConnectionRegistry::new()),
            backend,
            forwarder,
            reporter,
            max_hops,
        }
    }

    /// Dispatches `command` and runs its follow-up before returning.
    pub fn handle_command(&self, command: &CommandFrame) -> ResultFrame {
        let Dispatch { result, follow_up } = self.dispatch(command);
        self.complete(follow_up);
        result
    }

    /// Interprets `command` without running its follow-up.
    pub fn dispatch(&self, command: &CommandFrame) -> Dispatch {
        info!(
            target: DISPATCH_TARGET,
            opcode = %command.opcode,
            payload_len = command.payload.len(),
            "command received"
        );
        match self.route(command) {
            Ok(Reply { payload, follow_up }) => Dispatch {
                result: ResultFrame::new(ResultCode::Ok, payload),
                follow_up,
            },
            Err(error) => {
                let code = error.result_code();
                warn!(
                    target: DISPATCH_TARGET,
                    opcode = %command.opcode,
                    %code,
                    error = %error,
                    "command failed"
                );
                Dispatch {
                    result: ResultFrame::with_code(code),
                    follow_up: FollowUp::default(),
                }
            }
        }
    }

    /// Runs deferred delivery and sends every pending forward.
    pub fn complete(&self, follow_up: FollowUp) {
        let FollowUp {
            delivery,
            mut forwards,
        } = follow_up;
        if let Some(delivery) = delivery {
            match FanOut::new(self).deliver(&delivery) {
                Ok(more) => forwards.extend(more),
                Err(error) => error!(
                    target: ROUTING_TARGET,
                    module_id = delivery.module_id,
                    conn_id = delivery.conn_id,
                    error = %error,
                    "deferred delivery abandoned"
                ),
            }
        }
        for forward in forwards {
            self.send(&forward);
        }
    }

    /// Route currently registered for `conn_id`.
    pub fn connection(&self, conn_id: u16) -> Result<Option<Connection>, DispatchError> {
        Ok(self.connections()?.lookup(conn_id).copied())
    }

    /// Session currently registered for `module_id`.
    pub fn module(&self, module_id: u16) -> Result<Option<ModuleSession>, DispatchError> {
        Ok(self.modules()?.lookup(module_id).copied())
    }

    pub(super) const fn max_hops(&self) -> u32 {
        self.max_hops
    }

    /// Hands an encrypted input to `module_id` and returns its outputs.
    pub(super) fn deliver_input(
        &self,
        module_id: u16,
        conn_id: u16,
        ciphertext: &[u8],
        tag: &Tag,
    ) -> Result<Vec<Output>, DispatchError> {
        let session = self.session(module_id)?;
        entries::handle_input(self.backend.as_ref(), session, conn_id, ciphertext, tag)
    }

    fn route(&self, command: &CommandFrame) -> Result<Reply, DispatchError> {
        let payload = command.payload.as_slice();
        match command.opcode {
            Opcode::AddConnection => self.add_connection(payload),
            Opcode::CallEntrypoint => self.call_entrypoint(payload),
            Opcode::RemoteOutput => Self::remote_output(payload),
            Opcode::LoadModule => self.load_module(payload),
            Opcode::Reset => self.reset(),
            Opcode::RegisterEntrypoint => Err(DispatchError::Unsupported {
                opcode: command.opcode,
            }),
            Opcode::Invalid => Ok(Reply::with_payload(payload.to_vec())),
        }
    }

    fn add_connection(&self, payload: &[u8]) -> Result<Reply, DispatchError> {
        let connection = Connection::from(AddConnection::parse(payload)?);
        debug!(
            target: DISPATCH_TARGET,
            conn_id = connection.conn_id,
            target_module = connection.target_module,
            is_local = connection.is_local,
            remote = %connection.remote(),
            "connection registered"
        );
        self.connections()?.upsert(connection);
        Ok(Reply::empty())
    }

    fn load_module(&self, payload: &[u8]) -> Result<Reply, DispatchError> {
        let (header, image) = LoadModuleHeader::parse(payload)?;
        let session = match self.backend.install(&header.uuid, image) {
            Ok(session) => session,
            Err(error) => {
                self.reporter.module_load_failed(header.module_id, &error);
                return Err(error.into());
            }
        };
        let module = ModuleSession {
            module_id: header.module_id,
            uuid: header.uuid,
            session,
        };
        let displaced = match self.modules() {
            Ok(mut modules) => modules.register(module),
            Err(error) => {
                self.backend.close(session);
                return Err(error);
            }
        };
        if let Some(previous) = displaced {
            self.backend.close(previous.session);
        }
        self.reporter.module_loaded(&module);
        Ok(Reply::empty())
    }

    fn call_entrypoint(&self, payload: &[u8]) -> Result<Reply, DispatchError> {
        let call = EntryCall::parse(payload)?;
        let backend = self.backend.as_ref();
        match call.entry {
            Entry::SetKey => {
                let args = SetKeyArgs::parse(call.args)?;
                entries::set_key(backend, self.session(call.module_id)?, &args)?;
                Ok(Reply::empty())
            }
            Entry::Attest => {
                let args = AttestArgs::parse(call.args)?;
                let mac = entries::attest(backend, self.session(call.module_id)?, &args)?;
                Ok(Reply::with_payload(mac))
            }
            Entry::Disable => {
                let args = DisableArgs::parse(call.args)?;
                entries::disable(backend, self.session(call.module_id)?, &args)?;
                Ok(Reply::empty())
            }
            Entry::User(index) => {
                entries::check_user_payload(call.args.len())?;
                let session = self.session(call.module_id)?;
                let outputs = entries::call_user(backend, session, index, call.args)?;
                let forwards = FanOut::new(self).route(outputs)?;
                Ok(Reply {
                    payload: Vec::new(),
                    follow_up: FollowUp {
                        delivery: None,
                        forwards,
                    },
                })
            }
        }
    }

    fn remote_output(payload: &[u8]) -> Result<Reply, DispatchError> {
        let output = RemoteOutput::parse(payload)?;
        debug!(
            target: DISPATCH_TARGET,
            module_id = output.module_id,
            conn_id = output.conn_id,
            ciphertext_len = output.ciphertext.len(),
            "remote output accepted"
        );
        Ok(Reply {
            payload: Vec::new(),
            follow_up: FollowUp {
                delivery: Some(Delivery {
                    module_id: output.module_id,
                    conn_id: output.conn_id,
                    ciphertext: output.ciphertext.to_vec(),
                    tag: output.tag,
                }),
                forwards: Vec::new(),
            },
        })
    }

    fn reset(&self) -> Result<Reply, DispatchError> {
        let sessions = self.modules()?.clear();
        let connections = self.connections()?.clear();
        for module in &sessions {
            self.backend.close(module.session);
        }
        self.reporter.registries_reset(sessions.len(), connections);
        Ok(Reply::empty())
    }

    fn send(&self, forward: &Forward) {
        match self.forwarder.forward(forward.destination, &forward.frame) {
            Ok(()) => debug!(
                target: ROUTING_TARGET,
                destination = %forward.destination,
                "output forwarded"
            ),
            Err(error) => warn!(
                target: ROUTING_TARGET,
                destination = %forward.destination,
                error = %error,
                "remote forward failed"
            ),
        }
    }

    fn session(&self, module_id: u16) -> Result<SessionHandle, DispatchError> {
        self.modules()?
            .lookup(module_id)
            .map(|module| module.session)
            .ok_or(DispatchError::UnknownModule { module_id })
    }

    fn modules(&self) -> Result<MutexGuard<'_, ModuleRegistry>, DispatchError> {
        self.modules
            .lock()
            .map_err(|_| DispatchError::internal("module registry lock poisoned"))
    }

    fn connections(&self) -> Result<MutexGuard<'_, ConnectionRegistry>, DispatchError> {
        self.connections
            .lock()
            .map_err(|_| DispatchError::internal("connection registry lock poisoned"))
    }
}
