//! Router harness wiring the scripted doubles together.

use std::net::Ipv4Addr;
use std::sync::Arc;

use eventmgr_wire::payload::{AddConnection, Entry, EntryCall, LoadModuleHeader};
use eventmgr_wire::{CommandFrame, ModuleUuid, Opcode, ResultCode, ResultFrame};

use crate::backend::SessionHandle;
use crate::dispatch::Router;

use super::{RecordingForwarder, RecordingHealthReporter, ScriptedBackend};

/// Hop bound used unless a scenario asks for another.
pub const DEFAULT_TEST_HOPS: u32 = 8;

/// UUID used by every scenario module; the registry keys on module id.
#[must_use]
pub const fn sample_uuid() -> ModuleUuid {
    ModuleUuid::from_bytes([
        0x8a, 0xaa, 0xf2, 0x00, 0x24, 0x50, 0x11, 0xe4, 0xab, 0xe2, 0x00, 0x02, 0xa5, 0xd5, 0xc5,
        0x1b,
    ])
}

/// Router plus the doubles behind it.
pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub forwarder: Arc<RecordingForwarder>,
    pub reporter: Arc<RecordingHealthReporter>,
    pub router: Router,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_max_hops(DEFAULT_TEST_HOPS)
    }

    pub fn with_max_hops(max_hops: u32) -> Self {
        let backend = Arc::new(ScriptedBackend::default());
        let forwarder = Arc::new(RecordingForwarder::default());
        let reporter = Arc::new(RecordingHealthReporter::default());
        let router = Router::new(
            backend.clone(),
            forwarder.clone(),
            reporter.clone(),
            max_hops,
        );
        Self {
            backend,
            forwarder,
            reporter,
            router,
        }
    }

    /// Sends one command through dispatch and follow-up.
    pub fn send(&self, opcode: Opcode, payload: Vec<u8>) -> ResultFrame {
        self.router
            .handle_command(&CommandFrame::new(opcode, payload))
    }

    /// Loads a module and returns the session the backend opened for it.
    pub fn load_module(&self, module_id: u16) -> SessionHandle {
        let payload = LoadModuleHeader {
            module_id,
            uuid: sample_uuid(),
        }
        .encode_with(&[0x7F, 0x45, 0x4C, 0x46]);
        let result = self.send(Opcode::LoadModule, payload);
        assert_eq!(result.code, ResultCode::Ok, "module {module_id} should load");
        self.router
            .module(module_id)
            .expect("registry lock")
            .expect("module registered")
            .session
    }

    /// Registers a local route from `conn_id` to `target_module`.
    pub fn connect_local(&self, conn_id: u16, target_module: u16) {
        self.add_connection(AddConnection {
            conn_id,
            target_module,
            is_local: true,
            remote_port: 0,
            remote_address: Ipv4Addr::UNSPECIFIED,
        });
    }

    /// Registers a remote route from `conn_id` to `target_module` behind `remote`.
    pub fn connect_remote(&self, conn_id: u16, target_module: u16, remote: (Ipv4Addr, u16)) {
        self.add_connection(AddConnection {
            conn_id,
            target_module,
            is_local: false,
            remote_port: remote.1,
            remote_address: remote.0,
        });
    }

    /// Calls `entry` on `module_id` with raw `args`.
    pub fn call(&self, module_id: u16, entry: Entry, args: &[u8]) -> ResultFrame {
        let payload = EntryCall {
            module_id,
            entry,
            args,
        }
        .encode();
        self.send(Opcode::CallEntrypoint, payload)
    }

    fn add_connection(&self, connection: AddConnection) {
        let result = self.send(Opcode::AddConnection, connection.encode());
        assert_eq!(result.code, ResultCode::Ok, "connection should register");
    }
}
