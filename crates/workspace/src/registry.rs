//! Live session windows, keyed by id.

use crate::session_window::SessionWindow;
use collections::FxHashMap;
use std::fmt;
use uuid::Uuid;

/// Identifies one session. Two sessions to the same host get different ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every open session window. An entry exists exactly while its session is
/// open.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: FxHashMap<SessionId, SessionWindow>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, window: SessionWindow) {
        let id = window.id();
        if let Some(mut previous) = self.sessions.insert(id, window) {
            util::debug_panic!("session {} registered twice", id);
            previous.close();
        }
        tracing::debug!(session = %id, count = self.sessions.len(), "Registered session");
    }

    /// Remove a session. Absent ids are a no-op.
    pub fn unregister(&mut self, id: SessionId) -> Option<SessionWindow> {
        let window = self.sessions.remove(&id);
        if window.is_some() {
            tracing::debug!(session = %id, count = self.sessions.len(), "Unregistered session");
        }
        window
    }

    pub fn get(&self, id: SessionId) -> Option<&SessionWindow> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut SessionWindow> {
        self.sessions.get_mut(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Live sessions, in no particular order.
    pub fn all(&self) -> impl Iterator<Item = &SessionWindow> {
        self.sessions.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.sessions.keys().copied()
    }

    /// Remove every session.
    pub fn drain(&mut self) -> impl Iterator<Item = SessionWindow> + '_ {
        self.sessions.drain().map(|(_, window)| window)
    }
}
