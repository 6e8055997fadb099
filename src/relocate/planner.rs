//! Relocation Planner: turns one move request into a validated move
//! operation, deciding target creation, anchor handling, and collisions.

use tracing::debug;

use crate::core::config::FlyttaConfig;
use crate::core::errors::{FlyttaError, Result};
use crate::relocate::request::{AnchorSpec, MoveRequest};
use crate::semantic::model::SemanticModel;
use crate::semantic::symbols::{SymbolId, SymbolKind, SymbolResolver};
use crate::workspace::session::WrapperRegistry;
use crate::workspace::snapshot::Workspace;

/// One validated, ready-to-execute move.
#[derive(Debug, Clone)]
pub struct MoveOperation {
    /// The originating request
    pub request: MoveRequest,
    /// Resolved symbol of the moved method
    pub member_symbol: SymbolId,
    /// Static flag of the moved method
    pub is_static: bool,
    /// Whether the target scope already exists
    pub target_exists: bool,
    /// Whether a missing field anchor must be materialized on the target
    pub create_anchor_field: bool,
}

impl MoveOperation {
    /// Final qualified name of the moved member.
    pub fn final_name(&self) -> String {
        self.request.qualified_target()
    }
}

/// Plans individual moves against one model snapshot.
#[derive(Debug)]
pub struct Planner<'a> {
    model: &'a SemanticModel,
    workspace: &'a Workspace,
    wrappers: &'a WrapperRegistry,
    config: &'a FlyttaConfig,
}

impl<'a> Planner<'a> {
    /// Create a planner over one snapshot.
    pub fn new(
        model: &'a SemanticModel,
        workspace: &'a Workspace,
        wrappers: &'a WrapperRegistry,
        config: &'a FlyttaConfig,
    ) -> Self {
        Self {
            model,
            workspace,
            wrappers,
            config,
        }
    }

    /// Validate one request and produce its move operation.
    pub fn plan(&self, request: &MoveRequest) -> Result<MoveOperation> {
        let source = self
            .model
            .type_info(&request.source_scope)
            .ok_or_else(|| FlyttaError::not_found("workspace", &request.source_scope))?;

        // The member must be declared directly by the source scope.
        let member_symbol = *source.members.get(&request.member).ok_or_else(|| {
            FlyttaError::not_found(&request.source_scope, &request.member)
        })?;
        let symbol = self.model.symbol(member_symbol);
        if symbol.kind != SymbolKind::Method {
            return Err(FlyttaError::validation(format!(
                "'{}' is a {}; only methods can be relocated",
                request.qualified_source(),
                symbol.kind.name()
            )));
        }

        // Idempotency guard: refuse to chain wrappers.
        if let Some(wrapper) = self.wrappers.lookup(&request.source_scope, &request.member) {
            return Err(FlyttaError::already_moved(
                &request.source_scope,
                &request.member,
                wrapper.qualified_target(),
            ));
        }

        if request.target_scope == request.source_scope {
            return Err(FlyttaError::validation(format!(
                "'{}' is already declared by '{}'",
                request.member, request.source_scope
            )));
        }

        self.check_anchor_kind(request, symbol.is_static)?;

        let target_exists = self.model.type_info(&request.target_scope).is_some();

        if let Some(existing) = self
            .model
            .member_symbol(&request.target_scope, &request.member)
        {
            return Err(FlyttaError::name_collision(
                &request.target_scope,
                &request.member,
                existing.kind.name(),
            ));
        }

        let create_anchor_field = self.check_anchor_target(request)?;

        let operation = MoveOperation {
            request: request.clone(),
            member_symbol,
            is_static: symbol.is_static,
            target_exists,
            create_anchor_field,
        };
        debug!(
            member = %operation.request.qualified_source(),
            target = %operation.request.qualified_target(),
            anchor = %operation.request.anchor.describe(),
            create_target = !operation.target_exists,
            "move planned"
        );
        Ok(operation)
    }

    fn check_anchor_kind(&self, request: &MoveRequest, is_static: bool) -> Result<()> {
        match (&request.anchor, is_static) {
            (AnchorSpec::None, true) => Ok(()),
            (_, true) => Err(FlyttaError::validation(format!(
                "'{}' is static and takes no anchor",
                request.qualified_source()
            ))),
            (AnchorSpec::None, false) => Err(FlyttaError::validation(format!(
                "'{}' is an instance method; an anchor is mandatory",
                request.qualified_source()
            ))),
            (AnchorSpec::Parameter { name }, false) => {
                // The added leading parameter must not collide with the
                // method's own parameters.
                let unit = self
                    .workspace
                    .unit_declaring(&request.source_scope)
                    .and_then(|p| self.workspace.unit(p))
                    .ok_or_else(|| {
                        FlyttaError::internal(format!(
                            "no unit declares '{}'",
                            request.source_scope
                        ))
                    })?;
                let method = unit
                    .type_decl(&request.source_scope)
                    .and_then(|t| t.method(&request.member))
                    .ok_or_else(|| {
                        FlyttaError::not_found(&request.source_scope, &request.member)
                    })?;
                if method.params.iter().any(|p| p.name == *name) {
                    return Err(FlyttaError::validation(format!(
                        "anchor parameter '{}' collides with a parameter of '{}'",
                        name,
                        request.qualified_source()
                    )));
                }
                Ok(())
            }
            (AnchorSpec::Field { .. }, false) => Ok(()),
        }
    }

    /// Validate a field anchor against the target; returns true when the
    /// field must be created.
    fn check_anchor_target(&self, request: &MoveRequest) -> Result<bool> {
        let AnchorSpec::Field { name } = &request.anchor else {
            return Ok(false);
        };

        let Some(existing) = self
            .model
            .member_symbol(&request.target_scope, name)
            .cloned()
        else {
            if !self.config.anchors.create_missing_fields {
                return Err(FlyttaError::not_found(&request.target_scope, name.clone()));
            }
            return Ok(true);
        };

        match existing.kind {
            SymbolKind::Field | SymbolKind::Property => {
                if existing.ty.as_deref() == Some(request.source_scope.as_str()) {
                    Ok(false)
                } else {
                    Err(FlyttaError::type_mismatch(
                        &request.target_scope,
                        name.clone(),
                        &request.source_scope,
                        existing.ty.unwrap_or_default(),
                    ))
                }
            }
            kind => Err(FlyttaError::name_collision(
                &request.target_scope,
                name.clone(),
                kind.name(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::expr::{Expr, Stmt};
    use crate::syntax::tree::{FieldDecl, Member, MethodDecl, Param, SourceUnit, TypeDecl};
    use crate::workspace::session::WrapperInfo;

    fn workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.add_unit(
            SourceUnit::new("Inventory.cs").with_type(
                TypeDecl::new("Inventory")
                    .with_member(Member::Field(FieldDecl::new("count", "int")))
                    .with_member(Member::Method(
                        MethodDecl::new("Tally", "int")
                            .with_body(vec![Stmt::Return(Some(Expr::ident("count")))]),
                    ))
                    .with_member(Member::Method(
                        MethodDecl::new("Reset", "void")
                            .static_()
                            .with_body(vec![Stmt::Return(None)]),
                    )),
            ),
        );
        ws.add_unit(
            SourceUnit::new("Reporting.cs").with_type(
                TypeDecl::new("Reporting")
                    .with_member(Member::Field(FieldDecl::new("inventory", "Inventory")))
                    .with_member(Member::Field(FieldDecl::new("title", "string"))),
            ),
        );
        ws
    }

    fn plan(
        ws: &Workspace,
        wrappers: &WrapperRegistry,
        request: MoveRequest,
    ) -> Result<MoveOperation> {
        let model = SemanticModel::analyze(ws).unwrap();
        let config = FlyttaConfig::default();
        Planner::new(&model, ws, wrappers, &config).plan(&request)
    }

    #[test]
    fn test_instance_move_with_existing_field_anchor() {
        let ws = workspace();
        let op = plan(
            &ws,
            &WrapperRegistry::default(),
            MoveRequest::new(
                "Inventory",
                "Tally",
                "Reporting",
                AnchorSpec::Field {
                    name: "inventory".into(),
                },
            ),
        )
        .unwrap();

        assert!(op.target_exists);
        assert!(!op.create_anchor_field);
        assert!(!op.is_static);
        assert_eq!(op.final_name(), "Reporting.Tally");
    }

    #[test]
    fn test_missing_anchor_field_is_created() {
        let ws = workspace();
        let op = plan(
            &ws,
            &WrapperRegistry::default(),
            MoveRequest::new(
                "Inventory",
                "Tally",
                "Reporting",
                AnchorSpec::Field {
                    name: "origin".into(),
                },
            ),
        )
        .unwrap();
        assert!(op.create_anchor_field);
    }

    #[test]
    fn test_anchor_field_with_wrong_type_fails() {
        let ws = workspace();
        let err = plan(
            &ws,
            &WrapperRegistry::default(),
            MoveRequest::new(
                "Inventory",
                "Tally",
                "Reporting",
                AnchorSpec::Field {
                    name: "title".into(),
                },
            ),
        )
        .unwrap_err();
        assert!(matches!(err, FlyttaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_instance_move_requires_anchor() {
        let ws = workspace();
        let err = plan(
            &ws,
            &WrapperRegistry::default(),
            MoveRequest::new("Inventory", "Tally", "Reporting", AnchorSpec::None),
        )
        .unwrap_err();
        assert!(matches!(err, FlyttaError::Validation { .. }));
    }

    #[test]
    fn test_static_move_rejects_anchor() {
        let ws = workspace();
        let err = plan(
            &ws,
            &WrapperRegistry::default(),
            MoveRequest::new(
                "Inventory",
                "Reset",
                "Reporting",
                AnchorSpec::Parameter {
                    name: "inv".into(),
                },
            ),
        )
        .unwrap_err();
        assert!(matches!(err, FlyttaError::Validation { .. }));
    }

    #[test]
    fn test_missing_member_not_found() {
        let ws = workspace();
        let err = plan(
            &ws,
            &WrapperRegistry::default(),
            MoveRequest::new("Inventory", "Missing", "Reporting", AnchorSpec::None),
        )
        .unwrap_err();
        assert!(matches!(err, FlyttaError::NotFound { .. }));
    }

    #[test]
    fn test_stub_from_prior_move_is_already_moved() {
        let ws = workspace();
        let mut wrappers = WrapperRegistry::default();
        wrappers.register(
            "Inventory",
            "Tally",
            WrapperInfo {
                target_scope: "Ledger".into(),
                target_member: "Tally".into(),
                anchor: AnchorSpec::Field {
                    name: "inventory".into(),
                },
            },
        );

        let err = plan(
            &ws,
            &wrappers,
            MoveRequest::new(
                "Inventory",
                "Tally",
                "Reporting",
                AnchorSpec::Field {
                    name: "inventory".into(),
                },
            ),
        )
        .unwrap_err();

        let FlyttaError::AlreadyMoved { moved_to, .. } = err else {
            panic!("expected AlreadyMoved");
        };
        assert_eq!(moved_to, "Ledger.Tally");
    }

    #[test]
    fn test_collision_with_existing_target_member() {
        let ws = workspace();
        let err = plan(
            &ws,
            &WrapperRegistry::default(),
            MoveRequest::new(
                "Inventory",
                "Tally",
                "Reporting",
                AnchorSpec::Field {
                    name: "inventory".into(),
                },
            ),
        );
        assert!(err.is_ok());

        // Same-named member already in the target.
        let mut ws = workspace();
        ws.unit_mut(std::path::Path::new("Reporting.cs"))
            .unwrap()
            .type_decl_mut("Reporting")
            .unwrap()
            .members
            .push(Member::Field(FieldDecl::new("Tally", "int")));
        let err = plan(
            &ws,
            &WrapperRegistry::default(),
            MoveRequest::new(
                "Inventory",
                "Tally",
                "Reporting",
                AnchorSpec::Field {
                    name: "inventory".into(),
                },
            ),
        )
        .unwrap_err();
        assert!(matches!(err, FlyttaError::NameCollision { .. }));
    }
}
