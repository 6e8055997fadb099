//! Main refactoring engine implementation.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::api::results::{
    BatchReport, InlineStubReport, MakeStaticReport, SafeDeleteReport,
};
use crate::core::config::FlyttaConfig;
use crate::core::errors::{FlyttaError, Result};
use crate::io::persistence::Persister;
use crate::ops::{inline_stub, make_static, safe_delete};
use crate::relocate::batch::BatchExecutor;
use crate::relocate::request::MoveBatchRequest;
use crate::syntax::render::Renderer;
use crate::workspace::session::{Session, SessionId, SessionStore};
use crate::workspace::snapshot::Workspace;

/// Main flytta refactoring engine: owns a session store and exposes the
/// batch API over it. Each method takes a session id from a prior
/// [`load_workspace`](Self::load_workspace) call; batches against one
/// session must be serialized by the caller.
pub struct RefactorEngine {
    /// Loaded program sessions
    sessions: SessionStore,

    /// Engine configuration
    config: FlyttaConfig,
}

impl RefactorEngine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self {
            sessions: SessionStore::new(),
            config: FlyttaConfig::default(),
        }
    }

    /// Create an engine with the given configuration.
    pub fn with_config(config: FlyttaConfig) -> Result<Self> {
        config.validate()?;
        info!("flytta engine initialized");
        Ok(Self {
            sessions: SessionStore::new(),
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &FlyttaConfig {
        &self.config
    }

    /// Load a workspace and return the handle for later operations.
    pub fn load_workspace(&self, workspace: Workspace) -> SessionId {
        self.sessions.load(workspace)
    }

    /// Unload a session, dropping its workspace and wrapper registry.
    pub fn unload(&self, id: SessionId) -> Result<()> {
        self.sessions.unload(id)
    }

    /// Number of loaded sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Execute a move batch atomically against a session.
    pub fn move_members(&self, id: SessionId, request: &MoveBatchRequest) -> Result<BatchReport> {
        self.with_session(id, |session| {
            BatchExecutor::new(&self.config).execute(session, request)
        })
    }

    /// Inline a delegating stub left by a prior move.
    pub fn inline_stub(&self, id: SessionId, scope: &str, member: &str) -> Result<InlineStubReport> {
        self.with_session(id, |session| {
            inline_stub::inline_stub(session, scope, member)
        })
    }

    /// Delete a member if the reference index proves it unreachable.
    pub fn safe_delete(&self, id: SessionId, scope: &str, member: &str) -> Result<SafeDeleteReport> {
        self.with_session(id, |session| {
            safe_delete::safe_delete(session, scope, member)
        })
    }

    /// Convert an instance method to static, updating all call sites.
    pub fn make_static(
        &self,
        id: SessionId,
        scope: &str,
        member: &str,
        parameter: Option<&str>,
    ) -> Result<MakeStaticReport> {
        self.with_session(id, |session| {
            make_static::make_static(session, &self.config, scope, member, parameter)
        })
    }

    /// Render one unit of a session to source text.
    pub fn render_unit(&self, id: SessionId, path: &Path) -> Result<String> {
        self.with_session(id, |session| {
            let unit = session.workspace.unit(path).ok_or_else(|| {
                FlyttaError::not_found("workspace", path.display().to_string())
            })?;
            Ok(Renderer::new().render_unit(unit))
        })
    }

    /// Persist every dirty unit of a session under `root`, atomically.
    pub fn persist(&self, id: SessionId, root: &Path) -> Result<Vec<PathBuf>> {
        self.with_session(id, |session| {
            Persister::new(&self.config).persist(&mut session.workspace, root)
        })
    }

    fn with_session<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        let session = self.sessions.get(id)?;
        let mut session = session.lock();
        f(&mut session)
    }
}

impl Default for RefactorEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocate::request::{AnchorSpec, MoveRequest};
    use crate::syntax::expr::{Expr, Stmt};
    use crate::syntax::tree::{FieldDecl, Member, MethodDecl, SourceUnit, TypeDecl};

    fn workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.add_unit(
            SourceUnit::new("Inventory.cs").with_type(
                TypeDecl::new("Inventory")
                    .with_member(Member::Field(FieldDecl::new("count", "int")))
                    .with_member(Member::Method(
                        MethodDecl::new("Tally", "int")
                            .with_body(vec![Stmt::Return(Some(Expr::ident("count")))]),
                    )),
            ),
        );
        ws
    }

    #[test]
    fn test_load_move_render_unload() {
        let engine = RefactorEngine::new();
        let id = engine.load_workspace(workspace());
        assert_eq!(engine.session_count(), 1);

        let report = engine
            .move_members(
                id,
                &MoveBatchRequest::new(vec![MoveRequest::new(
                    "Inventory",
                    "Tally",
                    "Reporting",
                    AnchorSpec::Field { name: "inv".into() },
                )]),
            )
            .unwrap();
        assert_eq!(report.moves.len(), 1);

        let rendered = engine
            .render_unit(id, Path::new("Reporting.cs"))
            .unwrap();
        assert!(rendered.contains("class Reporting"));
        assert!(rendered.contains("inv.count"));

        engine.unload(id).unwrap();
        assert_eq!(engine.session_count(), 0);
    }

    #[test]
    fn test_unknown_session_is_not_found() {
        let engine = RefactorEngine::new();
        let err = engine.render_unit(SessionId::fresh(), Path::new("x.cs"));
        assert!(err.is_err());
    }

    #[test]
    fn test_persist_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let engine = RefactorEngine::new();
        let id = engine.load_workspace(workspace());
        // Loading marks nothing dirty; move something first.
        engine
            .move_members(
                id,
                &MoveBatchRequest::new(vec![MoveRequest::new(
                    "Inventory",
                    "Tally",
                    "Reporting",
                    AnchorSpec::Field { name: "inv".into() },
                )]),
            )
            .unwrap();
        let written = engine.persist(id, dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        for path in written {
            assert!(path.exists());
        }
    }
}
