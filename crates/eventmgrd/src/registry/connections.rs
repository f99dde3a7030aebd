use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};

use eventmgr_wire::payload::AddConnection;

/// Routing entry for outputs addressed to `conn_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Connection identifier.
    pub conn_id: u16,
    /// Module that receives the output.
    pub target_module: u16,
    /// Whether `target_module` runs on this node.
    pub is_local: bool,
    /// Port of the remote Event Manager.
    pub remote_port: u16,
    /// Address of the remote Event Manager.
    pub remote_address: Ipv4Addr,
}

impl Connection {
    /// Socket address of the remote Event Manager.
    #[must_use]
    pub const fn remote(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.remote_address, self.remote_port)
    }
}

impl From<AddConnection> for Connection {
    fn from(payload: AddConnection) -> Self {
        Self {
            conn_id: payload.conn_id,
            target_module: payload.target_module,
            is_local: payload.is_local,
            remote_port: payload.remote_port,
            remote_address: payload.remote_address,
        }
    }
}

/// Routing table keyed by connection id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    routes: HashMap<u16, Connection>,
}

impl ConnectionRegistry {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `connection`, replacing any entry with the same id whole.
    pub fn upsert(&mut self, connection: Connection) -> Option<Connection> {
        self.routes.insert(connection.conn_id, connection)
    }

    /// Route registered for `conn_id`.
    #[must_use]
    pub fn lookup(&self, conn_id: u16) -> Option<&Connection> {
        self.routes.get(&conn_id)
    }

    /// Drops every route, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.routes.len();
        self.routes.clear();
        count
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
