//! Property test: batch execution order is a topological order of the
//! dependency graph, with declaration order breaking ties.

use proptest::prelude::*;

use flytta::relocate::batch::BatchExecutor;
use flytta::relocate::request::{AnchorSpec, MoveBatchRequest, MoveRequest};
use flytta::syntax::expr::{Expr, Stmt};
use flytta::syntax::tree::{Member, MethodDecl, SourceUnit, TypeDecl};
use flytta::workspace::session::{Session, SessionId};
use flytta::workspace::snapshot::Workspace;
use flytta::FlyttaConfig;

/// Random DAG as adjacency lists: method `k` may only call methods declared
/// before it, so the graph is acyclic by construction.
fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (2usize..8).prop_flat_map(|n| {
        (0..n)
            .map(|k| {
                if k == 0 {
                    Just(Vec::new()).boxed()
                } else {
                    prop::collection::vec(0..k, 0..=k.min(3))
                        .prop_map(|mut deps| {
                            deps.sort_unstable();
                            deps.dedup();
                            deps
                        })
                        .boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

fn workspace_for(deps: &[Vec<usize>]) -> Workspace {
    let mut hub = TypeDecl::new("Hub");
    for (k, callees) in deps.iter().enumerate() {
        let body = callees
            .iter()
            .map(|c| Stmt::Expr(Expr::invoke(Expr::ident(format!("M{c}")), vec![])))
            .collect();
        hub = hub.with_member(Member::Method(
            MethodDecl::new(format!("M{k}"), "void").static_().with_body(body),
        ));
    }
    let mut ws = Workspace::new();
    ws.add_unit(SourceUnit::new("Hub.cs").with_type(hub));
    ws
}

fn execute(deps: &[Vec<usize>]) -> Vec<String> {
    let config = FlyttaConfig::default();
    let mut session = Session {
        id: SessionId::fresh(),
        workspace: workspace_for(deps),
        wrappers: Default::default(),
    };
    let batch = MoveBatchRequest::new(
        (0..deps.len())
            .map(|k| MoveRequest::new("Hub", format!("M{k}"), "Spoke", AnchorSpec::None))
            .collect(),
    );
    BatchExecutor::new(&config)
        .execute(&mut session, &batch)
        .unwrap()
        .execution_order
}

proptest! {
    #[test]
    fn dependencies_always_precede_dependents(deps in dag_strategy()) {
        let order = execute(&deps);
        prop_assert_eq!(order.len(), deps.len());

        let position = |name: &str| order.iter().position(|o| o == name).unwrap();
        for (k, callees) in deps.iter().enumerate() {
            for c in callees {
                prop_assert!(
                    position(&format!("Hub.M{c}")) < position(&format!("Hub.M{k}")),
                    "M{} must move before its dependent M{} in {:?}",
                    c, k, order
                );
            }
        }
    }

    #[test]
    fn independent_members_keep_declaration_order(n in 2usize..8) {
        let deps = vec![Vec::new(); n];
        let order = execute(&deps);
        let expected: Vec<String> = (0..n).map(|k| format!("Hub.M{k}")).collect();
        prop_assert_eq!(order, expected);
    }
}
