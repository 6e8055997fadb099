//! Instance-to-static conversion: the parameter-anchor rewrite applied
//! without relocation. The method gains a leading parameter of its own
//! scope's type, implicit state access is routed through it, and every call
//! site passes its receiver as the new first argument.

use std::collections::HashMap;

use tracing::info;

use crate::api::results::MakeStaticReport;
use crate::core::config::FlyttaConfig;
use crate::core::errors::{FlyttaError, Result};
use crate::relocate::callsites::CallSiteUpdater;
use crate::relocate::request::AnchorSpec;
use crate::relocate::rewriter::{MovedTarget, RewriteContext, Rewriter};
use crate::semantic::model::SemanticModel;
use crate::semantic::symbols::SymbolResolver;
use crate::syntax::tree::Member;
use crate::workspace::session::Session;

/// Convert `scope.member` to a static method. `parameter` names the injected
/// leading parameter; `None` takes the configured default. The session is
/// unchanged on any error.
pub fn make_static(
    session: &mut Session,
    config: &FlyttaConfig,
    scope: &str,
    member: &str,
    parameter: Option<&str>,
) -> Result<MakeStaticReport> {
    let model = SemanticModel::analyze(&session.workspace)?;
    let symbol = model
        .member_symbol(scope, member)
        .ok_or_else(|| FlyttaError::not_found(scope, member))?
        .clone();
    if symbol.is_static {
        return Err(FlyttaError::validation(format!(
            "'{scope}.{member}' is already static"
        )));
    }

    let parameter = parameter
        .unwrap_or(&config.anchors.default_parameter_name)
        .to_string();

    let path = session
        .workspace
        .unit_declaring(scope)
        .map(std::path::Path::to_path_buf)
        .ok_or_else(|| FlyttaError::not_found("workspace", scope))?;
    let original = session
        .workspace
        .unit(&path)
        .and_then(|u| u.type_decl(scope))
        .and_then(|t| t.method(member))
        .cloned()
        .ok_or_else(|| FlyttaError::not_found(scope, member))?;
    if original.params.iter().any(|p| p.name == parameter) {
        return Err(FlyttaError::validation(format!(
            "'{scope}.{member}' already declares a parameter named '{parameter}'"
        )));
    }

    let anchor = AnchorSpec::Parameter {
        name: parameter.clone(),
    };
    let mut moved = HashMap::new();
    moved.insert(
        symbol.id,
        MovedTarget {
            target_scope: scope.to_string(),
            member: member.to_string(),
            anchor: anchor.clone(),
        },
    );

    let ctx = RewriteContext {
        model: &model,
        source_scope: scope,
        anchor: &anchor,
        moved: &moved,
        leave_stubs: false,
    };
    let outcome = Rewriter::new(ctx, member).rewrite_method(&original)?;

    let mut working = session.workspace.clone();
    {
        let unit = working
            .unit_mut(&path)
            .ok_or_else(|| FlyttaError::internal("declaring unit vanished during conversion"))?;
        let ty = unit
            .type_decl_mut(scope)
            .ok_or_else(|| FlyttaError::internal("declaring scope vanished during conversion"))?;
        let index = ty
            .members
            .iter()
            .position(|m| m.name() == member)
            .ok_or_else(|| FlyttaError::not_found(scope, member))?;
        ty.members[index] = Member::Method(outcome.method);
    }

    let call_sites = CallSiteUpdater::new(&model, &moved).propagate(&mut working)?;
    working.commit();
    session.workspace = working;

    let report = MakeStaticReport {
        member: format!("{scope}.{member}"),
        parameter,
        references_rewritten: outcome.manifest.rewritten,
        call_sites_rewritten: call_sites,
    };
    info!(
        member = %report.member,
        parameter = %report.parameter,
        sites = call_sites,
        "method made static"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::expr::{Arg, Expr, Stmt};
    use crate::syntax::render::Renderer;
    use crate::syntax::tree::{FieldDecl, MethodDecl, Param, SourceUnit, TypeDecl};
    use crate::workspace::session::SessionId;
    use crate::workspace::snapshot::Workspace;

    fn session() -> Session {
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
        Session {
            id: SessionId::fresh(),
            workspace: ws,
            wrappers: Default::default(),
        }
    }

    #[test]
    fn test_converts_signature_body_and_call_sites() {
        let config = FlyttaConfig::default();
        let mut session = session();
        let report = make_static(&mut session, &config, "Inventory", "Tally", None).unwrap();
        assert_eq!(report.parameter, "self");
        assert_eq!(report.call_sites_rewritten, 1);

        let method = session
            .workspace
            .unit(std::path::Path::new("Inventory.cs"))
            .unwrap()
            .type_decl("Inventory")
            .unwrap()
            .method("Tally")
            .unwrap()
            .clone();
        assert!(method.is_static);
        assert_eq!(method.params[0], Param::new("self", "Inventory"));
        let body = match &method.body[0] {
            Stmt::Return(Some(e)) => Renderer::new().render_expr(e),
            other => panic!("unexpected body: {other:?}"),
        };
        assert_eq!(body, "self.count");

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
        assert_eq!(rendered, "Inventory.Tally(inv, 2)");
    }

    #[test]
    fn test_already_static_is_rejected() {
        let config = FlyttaConfig::default();
        let mut session = session();
        make_static(&mut session, &config, "Inventory", "Tally", None).unwrap();
        let err = make_static(&mut session, &config, "Inventory", "Tally", None).unwrap_err();
        assert!(matches!(err, FlyttaError::Validation { .. }));
    }

    #[test]
    fn test_parameter_name_collision_is_rejected() {
        let config = FlyttaConfig::default();
        let mut session = session();
        let err =
            make_static(&mut session, &config, "Inventory", "Tally", Some("scale")).unwrap_err();
        assert!(matches!(err, FlyttaError::Validation { .. }));
    }
}
