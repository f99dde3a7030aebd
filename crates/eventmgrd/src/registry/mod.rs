//! Module sessions and connection routes known to the daemon.
//!
//! Both registries are plain maps. The router owns one of each behind its
//! own mutex and copies entries out, so callers never hold a registry while
//! talking to the backend or the network.

mod connections;
mod modules;

pub use connections::{Connection, ConnectionRegistry};
pub use modules::{ModuleRegistry, ModuleSession};
