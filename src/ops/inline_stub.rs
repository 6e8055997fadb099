//! Stub inlining: removes a delegating stub left by a prior move and
//! rewrites its remaining callers to reach the relocated member directly.
//!
//! This is the escape hatch the AlreadyMoved guard points callers to: a stub
//! cannot be moved again, but it can be inlined away once its indirection is
//! no longer wanted. Call sites take the same shapes the propagate strategy
//! produces, so a site the shape cannot express aborts the operation and
//! leaves the stub in place.

use std::collections::HashMap;

use tracing::info;

use crate::api::results::InlineStubReport;
use crate::core::errors::{FlyttaError, Result};
use crate::relocate::callsites::CallSiteUpdater;
use crate::relocate::rewriter::MovedTarget;
use crate::semantic::model::SemanticModel;
use crate::workspace::session::Session;

/// Inline the stub `scope.member`, removing it and redirecting its callers.
/// The session is unchanged on any error.
pub fn inline_stub(session: &mut Session, scope: &str, member: &str) -> Result<InlineStubReport> {
    let wrapper = session
        .wrappers
        .lookup(scope, member)
        .cloned()
        .ok_or_else(|| {
            FlyttaError::validation(format!(
                "'{scope}.{member}' is not a delegating stub known to this session"
            ))
        })?;

    let model = SemanticModel::analyze(&session.workspace)?;
    let symbol = model
        .member_symbol(scope, member)
        .ok_or_else(|| FlyttaError::not_found(scope, member))?
        .id;

    let target = MovedTarget {
        target_scope: wrapper.target_scope.clone(),
        member: wrapper.target_member.clone(),
        anchor: wrapper.anchor.clone(),
    };
    let mut moved = HashMap::new();
    moved.insert(symbol, target);

    let mut working = session.workspace.clone();
    remove_member(&mut working, scope, member)?;

    let call_sites = CallSiteUpdater::new(&model, &moved).propagate(&mut working)?;
    working.commit();

    session.workspace = working;
    session.wrappers.remove(scope, member);

    let report = InlineStubReport {
        stub: format!("{scope}.{member}"),
        target: wrapper.qualified_target(),
        call_sites_rewritten: call_sites,
    };
    info!(
        stub = %report.stub,
        target = %report.target,
        sites = call_sites,
        "stub inlined"
    );
    Ok(report)
}

fn remove_member(
    workspace: &mut crate::workspace::snapshot::Workspace,
    scope: &str,
    member: &str,
) -> Result<()> {
    let path = workspace
        .unit_declaring(scope)
        .map(std::path::Path::to_path_buf)
        .ok_or_else(|| FlyttaError::not_found("workspace", scope))?;
    let unit = workspace
        .unit_mut(&path)
        .ok_or_else(|| FlyttaError::internal("declaring unit vanished during inline"))?;
    let ty = unit
        .type_decl_mut(scope)
        .ok_or_else(|| FlyttaError::internal("declaring scope vanished during inline"))?;
    let index = ty
        .members
        .iter()
        .position(|m| m.name() == member)
        .ok_or_else(|| FlyttaError::not_found(scope, member))?;
    ty.members.remove(index);
    Ok(())
}
