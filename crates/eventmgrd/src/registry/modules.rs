use std::collections::HashMap;

use eventmgr_wire::ModuleUuid;

use crate::backend::SessionHandle;

/// A loaded module and the session it is invoked through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSession {
    /// Local identifier.
    pub module_id: u16,
    /// Secure-world identifier.
    pub uuid: ModuleUuid,
    /// Open session.
    pub session: SessionHandle,
}

/// Loaded modules keyed by module id.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    sessions: HashMap<u16, ModuleSession>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `session`, returning the session it displaced, if any.
    pub fn register(&mut self, session: ModuleSession) -> Option<ModuleSession> {
        self.sessions.insert(session.module_id, session)
    }

    /// Session registered under `module_id`.
    #[must_use]
    pub fn lookup(&self, module_id: u16) -> Option<&ModuleSession> {
        self.sessions.get(&module_id)
    }

    /// Removes every session and hands them back so they can be closed.
    pub fn clear(&mut self) -> Vec<ModuleSession> {
        self.sessions.drain().map(|(_, session)| session).collect()
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no module is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn session(module_id: u16, raw: u64) -> ModuleSession {
        ModuleSession {
            module_id,
            uuid: ModuleUuid::from_bytes([0x5A; 16]),
            session: SessionHandle::new(raw),
        }
    }

    #[fixture]
    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register(session(1, 10));
        registry.register(session(2, 20));
        registry
    }

    #[rstest]
    fn lookup_finds_registered_sessions(registry: ModuleRegistry) {
        assert_eq!(registry.lookup(2), Some(&session(2, 20)));
        assert_eq!(registry.lookup(3), None);
    }

    #[rstest]
    fn reregistering_replaces_and_returns_previous(mut registry: ModuleRegistry) {
        let previous = registry.register(session(1, 11));
        assert_eq!(previous, Some(session(1, 10)));
        assert_eq!(registry.lookup(1), Some(&session(1, 11)));
        assert_eq!(registry.len(), 2);
    }

    #[rstest]
    fn clear_drains_every_session(mut registry: ModuleRegistry) {
        let mut drained = registry.clear();
        drained.sort_by_key(|entry| entry.module_id);
        assert_eq!(drained, vec![session(1, 10), session(2, 20)]);
        assert!(registry.is_empty());
    }
}
