//! Process-wide session store with explicit load/unload lifecycle.
//!
//! Each session holds one loaded workspace plus the wrapper registry that
//! backs the already-moved guard. Concurrent batches against one session are
//! not supported; the per-session mutex serializes access, and callers hold
//! it for the duration of a batch.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::core::errors::{FlyttaError, Result};
use crate::relocate::request::AnchorSpec;
use crate::workspace::snapshot::Workspace;

/// Handle to one loaded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Allocate a new unique session id.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID, for reports.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a delegating stub forwards to.
#[derive(Debug, Clone, PartialEq)]
pub struct WrapperInfo {
    /// Destination scope of the prior move
    pub target_scope: String,
    /// Destination member name
    pub target_member: String,
    /// Anchor the prior move used
    pub anchor: AnchorSpec,
}

impl WrapperInfo {
    /// `Target.Member` the stub forwards to.
    pub fn qualified_target(&self) -> String {
        format!("{}.{}", self.target_scope, self.target_member)
    }
}

/// Stubs created by prior moves in this session, keyed by the scope and
/// member still carrying them.
#[derive(Debug, Clone, Default)]
pub struct WrapperRegistry {
    entries: HashMap<(String, String), WrapperInfo>,
}

impl WrapperRegistry {
    /// Record a stub left behind at `scope.member`.
    pub fn register(&mut self, scope: &str, member: &str, info: WrapperInfo) {
        self.entries
            .insert((scope.to_string(), member.to_string()), info);
    }

    /// Stub info for `scope.member`, if it is a stub from this session.
    pub fn lookup(&self, scope: &str, member: &str) -> Option<&WrapperInfo> {
        self.entries
            .get(&(scope.to_string(), member.to_string()))
    }

    /// Forget a stub, typically after inlining it.
    pub fn remove(&mut self, scope: &str, member: &str) -> Option<WrapperInfo> {
        self.entries
            .remove(&(scope.to_string(), member.to_string()))
    }

    /// Number of registered stubs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no stubs are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One loaded program plus its per-session refactoring state.
#[derive(Debug)]
pub struct Session {
    /// Session handle
    pub id: SessionId,
    /// The loaded program
    pub workspace: Workspace,
    /// Stubs created by prior moves in this session
    pub wrappers: WrapperRegistry,
}

/// Store of loaded sessions. Process-wide mutable state with an explicit
/// load/unload lifecycle; see [`global`] for the shared instance.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<Mutex<Session>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a workspace as a new session and return its handle.
    pub fn load(&self, workspace: Workspace) -> SessionId {
        let id = SessionId::fresh();
        info!(session = %id, units = workspace.unit_count(), "session loaded");
        self.sessions.insert(
            id,
            Arc::new(Mutex::new(Session {
                id,
                workspace,
                wrappers: WrapperRegistry::default(),
            })),
        );
        id
    }

    /// Fetch a loaded session.
    pub fn get(&self, id: SessionId) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| FlyttaError::not_found("session", id.to_string()))
    }

    /// Unload a session, dropping its workspace.
    pub fn unload(&self, id: SessionId) -> Result<()> {
        self.sessions
            .remove(&id)
            .map(|_| info!(session = %id, "session unloaded"))
            .ok_or_else(|| FlyttaError::not_found("session", id.to_string()))
    }

    /// Number of loaded sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no sessions are loaded.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

static GLOBAL_SESSIONS: Lazy<SessionStore> = Lazy::new(SessionStore::new);

/// The process-wide session store.
pub fn global() -> &'static SessionStore {
    &GLOBAL_SESSIONS
}
