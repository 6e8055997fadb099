//! Batch orchestration: runs a whole move batch atomically against a
//! session.
//!
//! The pipeline is plan, conflict-check, order, then execute in dependency
//! order on a working copy of the workspace. The session's workspace is
//! swapped for the working copy only after every step of every move has
//! succeeded, so a failing batch leaves the session byte-for-byte unchanged.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::results::{BatchReport, MoveReport};
use crate::core::config::FlyttaConfig;
use crate::core::errors::{FlyttaError, Result};
use crate::relocate::callsites::CallSiteUpdater;
use crate::relocate::graph::DependencyGraph;
use crate::relocate::guard::ConflictGuard;
use crate::relocate::materializer::Materializer;
use crate::relocate::planner::{MoveOperation, Planner};
use crate::relocate::request::{MoveBatchRequest, WrapperStrategy};
use crate::relocate::rewriter::{MovedTarget, RewriteContext, Rewriter};
use crate::semantic::model::SemanticModel;
use crate::semantic::symbols::SymbolId;
use crate::workspace::session::{Session, WrapperInfo};

/// Executes move batches.
#[derive(Debug)]
pub struct BatchExecutor<'a> {
    config: &'a FlyttaConfig,
}

impl<'a> BatchExecutor<'a> {
    /// Create an executor with the session configuration.
    pub fn new(config: &'a FlyttaConfig) -> Self {
        Self { config }
    }

    /// Run `request` against `session`. On success the session holds the
    /// transformed workspace and, under the stub strategy, a wrapper registry
    /// entry per moved member. On any error the session is unchanged.
    pub fn execute(
        &self,
        session: &mut Session,
        request: &MoveBatchRequest,
    ) -> Result<BatchReport> {
        if request.moves.is_empty() {
            return Err(FlyttaError::validation("move batch contains no moves"));
        }
        let started_at = Utc::now();

        let model = SemanticModel::analyze(&session.workspace)?;
        let planner = Planner::new(&model, &session.workspace, &session.wrappers, self.config);
        let operations: Vec<MoveOperation> = request
            .moves
            .iter()
            .map(|m| planner.plan(m))
            .collect::<Result<_>>()?;
        ConflictGuard::new().check(&operations)?;

        let candidates: Vec<SymbolId> = operations.iter().map(|op| op.member_symbol).collect();
        let graph = DependencyGraph::build(&model, &candidates)?;

        let moved: HashMap<SymbolId, MovedTarget> = operations
            .iter()
            .map(|op| {
                (
                    op.member_symbol,
                    MovedTarget {
                        target_scope: op.request.target_scope.clone(),
                        member: op.request.member.clone(),
                        anchor: op.request.anchor.clone(),
                    },
                )
            })
            .collect();

        let strategy = request
            .strategy
            .unwrap_or(self.config.wrappers.default_strategy);
        let leave_stubs = strategy == WrapperStrategy::DelegatingStub;
        let updater = CallSiteUpdater::new(&model, &moved);
        let materializer = Materializer::new(self.config);

        // All edits land on a working copy; the session sees nothing until
        // the whole batch has succeeded.
        let mut working = session.workspace.clone();
        let dirty_before: BTreeSet<PathBuf> =
            working.dirty_units().map(Path::to_path_buf).collect();
        let mut moves = Vec::with_capacity(operations.len());
        let mut execution_order = Vec::with_capacity(operations.len());

        for unit in &graph.units {
            for &index in &unit.members {
                let op = &operations[index];
                let original = extract_method(&working, op)?;

                let ctx = RewriteContext {
                    model: &model,
                    source_scope: &op.request.source_scope,
                    anchor: &op.request.anchor,
                    moved: &moved,
                    leave_stubs,
                };
                let outcome =
                    Rewriter::new(ctx, &op.request.member).rewrite_method(&original)?;

                let stub = match moved.get(&op.member_symbol) {
                    Some(target) if leave_stubs => Some(updater.make_stub(&original, target)),
                    _ => None,
                };
                materializer.apply(&mut working, op, outcome.method, stub)?;

                debug!(
                    member = %op.request.qualified_source(),
                    target = %op.request.qualified_target(),
                    cyclic = unit.cyclic,
                    "member relocated"
                );
                execution_order.push(op.request.qualified_source());
                moves.push(MoveReport {
                    source: op.request.qualified_source(),
                    target: op.request.qualified_target(),
                    anchor: op.request.anchor.describe(),
                    references_rewritten: outcome.manifest.rewritten,
                    stubbed: leave_stubs,
                    target_created: !op.target_exists,
                    anchor_field_created: op.create_anchor_field,
                });
            }
        }

        let call_sites_rewritten = if leave_stubs {
            0
        } else {
            updater.propagate(&mut working)?
        };

        // Units this batch modified: newly dirtied ones, plus every source
        // and target unit even when a prior unpersisted batch already
        // dirtied them.
        let mut units_touched: BTreeSet<PathBuf> = working
            .dirty_units()
            .filter(|p| !dirty_before.contains(*p))
            .map(Path::to_path_buf)
            .collect();
        for op in &operations {
            for scope in [&op.request.source_scope, &op.request.target_scope] {
                if let Some(path) = working.unit_declaring(scope) {
                    units_touched.insert(path.to_path_buf());
                }
            }
        }

        working.commit();
        session.workspace = working;

        if leave_stubs {
            for op in &operations {
                session.wrappers.register(
                    &op.request.source_scope,
                    &op.request.member,
                    WrapperInfo {
                        target_scope: op.request.target_scope.clone(),
                        target_member: op.request.member.clone(),
                        anchor: op.request.anchor.clone(),
                    },
                );
            }
        }

        let cycle_groups = graph
            .cycle_groups()
            .iter()
            .map(|unit| {
                unit.members
                    .iter()
                    .map(|&i| operations[i].request.qualified_source())
                    .collect()
            })
            .collect();

        let report = BatchReport {
            batch_id: Uuid::new_v4(),
            started_at,
            completed_at: Utc::now(),
            strategy,
            execution_order,
            cycle_groups,
            moves,
            call_sites_rewritten,
            units_touched: units_touched.into_iter().collect(),
        };
        info!(batch = %report.batch_id, "{}", report.summary());
        Ok(report)
    }
}

fn extract_method(
    workspace: &crate::workspace::snapshot::Workspace,
    op: &MoveOperation,
) -> Result<crate::syntax::tree::MethodDecl> {
    workspace
        .unit_declaring(&op.request.source_scope)
        .and_then(|path| workspace.unit(path))
        .and_then(|unit| unit.type_decl(&op.request.source_scope))
        .and_then(|ty| ty.method(&op.request.member))
        .cloned()
        .ok_or_else(|| {
            FlyttaError::internal(format!(
                "planned member '{}' vanished before execution",
                op.request.qualified_source()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocate::request::{AnchorSpec, MoveRequest};
    use crate::syntax::expr::{Arg, Expr, Stmt};
    use crate::syntax::render::Renderer;
    use crate::syntax::tree::{
        FieldDecl, Member, MethodDecl, Param, SourceUnit, TypeDecl,
    };
    use crate::workspace::session::{Session, SessionId};
    use crate::workspace::snapshot::Workspace;

    fn session(workspace: Workspace) -> Session {
        Session {
            id: SessionId::fresh(),
            workspace,
            wrappers: Default::default(),
        }
    }

    /// Inventory.Tally reads `count`; Caller.Run calls inv.Tally(2).
    fn workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.add_unit(
            SourceUnit::new("Inventory.cs").with_type(
                TypeDecl::new("Inventory")
                    .with_member(Member::Field(FieldDecl::new("count", "int")))
                    .with_member(Member::Method(
                        MethodDecl::new("Tally", "int")
                            .with_param(Param::new("scale", "int"))
                            .with_body(vec![Stmt::Return(Some(Expr::ident("count")))]),
                    )),
            ),
        );
        ws.add_unit(
            SourceUnit::new("Caller.cs").with_type(
                TypeDecl::new("Caller")
                    .with_member(Member::Field(FieldDecl::new("inv", "Inventory")))
                    .with_member(Member::Method(
                        MethodDecl::new("Run", "void").with_body(vec![Stmt::Expr(Expr::invoke(
                            Expr::member(Expr::ident("inv"), "Tally"),
                            vec![Arg::positional(Expr::int(2))],
                        ))]),
                    )),
            ),
        );
        ws
    }

    fn field_move() -> MoveBatchRequest {
        MoveBatchRequest::new(vec![MoveRequest::new(
            "Inventory",
            "Tally",
            "Reporting",
            AnchorSpec::Field { name: "inv".into() },
        )])
    }

    #[test]
    fn test_stub_batch_moves_member_and_registers_wrapper() {
        let config = FlyttaConfig::default();
        let mut session = session(workspace());
        let report = BatchExecutor::new(&config)
            .execute(&mut session, &field_move())
            .unwrap();

        assert_eq!(report.moves.len(), 1);
        assert!(report.moves[0].stubbed);
        assert_eq!(
            report.units_touched,
            vec![PathBuf::from("Inventory.cs"), PathBuf::from("Reporting.cs")]
        );
        assert!(session.wrappers.lookup("Inventory", "Tally").is_some());

        // Moved declaration is on the target; a stub remains at the source.
        let target = session
            .workspace
            .unit(std::path::Path::new("Reporting.cs"))
            .unwrap()
            .type_decl("Reporting")
            .unwrap();
        assert!(target.method("Tally").is_some());
        let stub = session
            .workspace
            .unit(std::path::Path::new("Inventory.cs"))
            .unwrap()
            .type_decl("Inventory")
            .unwrap()
            .method("Tally")
            .unwrap()
            .clone();
        let rendered = match &stub.body[0] {
            Stmt::Return(Some(e)) => Renderer::new().render_expr(e),
            other => panic!("unexpected stub body: {other:?}"),
        };
        assert_eq!(rendered, "new Reporting() { inv = this }.Tally(scale)");
    }

    #[test]
    fn test_failed_batch_leaves_session_untouched() {
        let config = FlyttaConfig::default();
        let mut session = session(workspace());
        let before = Renderer::new().render_unit(
            session
                .workspace
                .unit(std::path::Path::new("Inventory.cs"))
                .unwrap(),
        );

        // Second move collides with the first in the same batch.
        let batch = MoveBatchRequest::new(vec![
            MoveRequest::new("Inventory", "Tally", "Reporting", AnchorSpec::None),
            MoveRequest::new("Inventory", "Tally", "Reporting", AnchorSpec::None),
        ]);
        let err = BatchExecutor::new(&config)
            .execute(&mut session, &batch)
            .unwrap_err();
        assert!(matches!(err, FlyttaError::Validation { .. }));

        let after = Renderer::new().render_unit(
            session
                .workspace
                .unit(std::path::Path::new("Inventory.cs"))
                .unwrap(),
        );
        assert_eq!(before, after);
        assert!(session.wrappers.is_empty());
    }

    #[test]
    fn test_propagate_batch_rewrites_caller_and_leaves_no_stub() {
        let config = FlyttaConfig::default();
        let mut session = session(workspace());
        let batch = field_move().with_strategy(WrapperStrategy::PropagateCallSites);
        let report = BatchExecutor::new(&config)
            .execute(&mut session, &batch)
            .unwrap();

        assert_eq!(report.call_sites_rewritten, 1);
        assert!(session.wrappers.is_empty());
        assert!(session
            .workspace
            .unit(std::path::Path::new("Inventory.cs"))
            .unwrap()
            .type_decl("Inventory")
            .unwrap()
            .method("Tally")
            .is_none());

        let run = session
            .workspace
            .unit(std::path::Path::new("Caller.cs"))
            .unwrap()
            .type_decl("Caller")
            .unwrap()
            .method("Run")
            .unwrap()
            .clone();
        let rendered = match &run.body[0] {
            Stmt::Expr(e) => Renderer::new().render_expr(e),
            other => panic!("unexpected body: {other:?}"),
        };
        assert_eq!(rendered, "new Reporting() { inv = inv }.Tally(2)");
    }

    #[test]
    fn test_configured_default_strategy_applies_without_override() {
        let mut config = FlyttaConfig::default();
        config.wrappers.default_strategy = WrapperStrategy::PropagateCallSites;
        let mut session = session(workspace());

        // No per-batch override: the configured default must win.
        let report = BatchExecutor::new(&config)
            .execute(&mut session, &field_move())
            .unwrap();

        assert_eq!(report.strategy, WrapperStrategy::PropagateCallSites);
        assert_eq!(report.call_sites_rewritten, 1);
        assert!(!report.moves[0].stubbed);
        assert!(session.wrappers.is_empty());
    }

    #[test]
    fn test_second_move_of_stub_reports_already_moved() {
        let config = FlyttaConfig::default();
        let mut session = session(workspace());
        let executor = BatchExecutor::new(&config);
        executor.execute(&mut session, &field_move()).unwrap();

        let err = executor
            .execute(
                &mut session,
                &MoveBatchRequest::new(vec![MoveRequest::new(
                    "Inventory",
                    "Tally",
                    "Ledger",
                    AnchorSpec::None,
                )]),
            )
            .unwrap_err();
        assert!(matches!(err, FlyttaError::AlreadyMoved { .. }));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let config = FlyttaConfig::default();
        let mut session = session(workspace());
        let err = BatchExecutor::new(&config)
            .execute(&mut session, &MoveBatchRequest::new(vec![]))
            .unwrap_err();
        assert!(matches!(err, FlyttaError::Validation { .. }));
    }
}
