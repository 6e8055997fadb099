//! Safe delete: removes a member only when the reference index proves no
//! other code reaches it. A blocked delete lists every blocking location so
//! the caller can decide what to untangle first.

use tracing::info;

use crate::api::results::SafeDeleteReport;
use crate::core::errors::{FlyttaError, Result};
use crate::semantic::model::SemanticModel;
use crate::semantic::symbols::SymbolResolver;
use crate::workspace::session::Session;

/// Delete `scope.member` if nothing outside the member itself references it.
/// The session is unchanged on any error.
pub fn safe_delete(session: &mut Session, scope: &str, member: &str) -> Result<SafeDeleteReport> {
    let model = SemanticModel::analyze(&session.workspace)?;
    let symbol = model
        .member_symbol(scope, member)
        .ok_or_else(|| FlyttaError::not_found(scope, member))?
        .clone();

    // Self-recursion does not keep a member alive.
    let blocking: Vec<String> = model
        .references(symbol.id)
        .iter()
        .filter(|r| !(r.scope == scope && r.member == member))
        .map(|r| r.to_string())
        .collect();
    if !blocking.is_empty() {
        return Err(FlyttaError::validation(format!(
            "'{scope}.{member}' is still referenced by: {}",
            blocking.join(", ")
        )));
    }

    let mut working = session.workspace.clone();
    let path = working
        .unit_declaring(scope)
        .map(std::path::Path::to_path_buf)
        .ok_or_else(|| FlyttaError::not_found("workspace", scope))?;
    let unit = working
        .unit_mut(&path)
        .ok_or_else(|| FlyttaError::internal("declaring unit vanished during delete"))?;
    let ty = unit
        .type_decl_mut(scope)
        .ok_or_else(|| FlyttaError::internal("declaring scope vanished during delete"))?;
    let index = ty
        .members
        .iter()
        .position(|m| m.name() == member)
        .ok_or_else(|| FlyttaError::not_found(scope, member))?;
    ty.members.remove(index);

    session.workspace = working;
    session.wrappers.remove(scope, member);

    let report = SafeDeleteReport {
        member: format!("{scope}.{member}"),
        kind: symbol.kind.name().to_string(),
    };
    info!(member = %report.member, kind = %report.kind, "member deleted");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::expr::{Expr, Stmt};
    use crate::syntax::tree::{FieldDecl, Member, MethodDecl, SourceUnit, TypeDecl};
    use crate::workspace::session::SessionId;
    use crate::workspace::snapshot::Workspace;

    fn session(audit_body: Vec<Stmt>) -> Session {
        let mut ws = Workspace::new();
        ws.add_unit(
            SourceUnit::new("Inventory.cs").with_type(
                TypeDecl::new("Inventory")
                    .with_member(Member::Field(FieldDecl::new("count", "int")))
                    .with_member(Member::Method(MethodDecl::new("Tally", "int")))
                    .with_member(Member::Method(
                        MethodDecl::new("Audit", "void").with_body(audit_body),
                    )),
            ),
        );
        Session {
            id: SessionId::fresh(),
            workspace: ws,
            wrappers: Default::default(),
        }
    }

    #[test]
    fn test_unreferenced_member_is_deleted() {
        let mut session = session(vec![]);
        let report = safe_delete(&mut session, "Inventory", "Tally").unwrap();
        assert_eq!(report.member, "Inventory.Tally");
        assert_eq!(report.kind, "method");
        let ty = session
            .workspace
            .unit(std::path::Path::new("Inventory.cs"))
            .unwrap()
            .type_decl("Inventory")
            .unwrap();
        assert!(ty.method("Tally").is_none());
    }

    #[test]
    fn test_referenced_member_blocks_with_locations() {
        let mut session = session(vec![Stmt::Expr(Expr::invoke(Expr::ident("Tally"), vec![]))]);
        let err = safe_delete(&mut session, "Inventory", "Tally").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Inventory.Audit"));
        assert!(session
            .workspace
            .unit(std::path::Path::new("Inventory.cs"))
            .unwrap()
            .type_decl("Inventory")
            .unwrap()
            .method("Tally")
            .is_some());
    }

    #[test]
    fn test_self_recursion_does_not_block() {
        let mut session = session(vec![]);
        {
            let ws = &mut session.workspace;
            let path = std::path::PathBuf::from("Inventory.cs");
            let unit = ws.unit_mut(&path).unwrap();
            let method = unit
                .type_decl_mut("Inventory")
                .unwrap()
                .method_mut("Tally")
                .unwrap();
            method.body = vec![Stmt::Return(Some(Expr::invoke(
                Expr::ident("Tally"),
                vec![],
            )))];
        }
        session.workspace.commit();
        assert!(safe_delete(&mut session, "Inventory", "Tally").is_ok());
    }
}
