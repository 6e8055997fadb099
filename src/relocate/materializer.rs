//! Target Materializer: performs the physical edit a planned move describes.
//!
//! Creates or extends the target scope (and its unit), merges the source
//! unit's imports into it, inserts a missing field anchor, removes the moved
//! declaration from the source scope, and installs the rewritten method on
//! the target. Under the stub strategy the source declaration is replaced in
//! place, so the surrounding member order survives the edit.

use std::path::PathBuf;

use tracing::debug;

use crate::core::config::FlyttaConfig;
use crate::core::errors::{FlyttaError, Result};
use crate::relocate::planner::MoveOperation;
use crate::relocate::request::AnchorSpec;
use crate::syntax::tree::{FieldDecl, Member, MethodDecl, SourceUnit, TypeDecl, Visibility};
use crate::workspace::snapshot::Workspace;

/// Applies planned moves to a working workspace copy.
#[derive(Debug)]
pub struct Materializer<'a> {
    config: &'a FlyttaConfig,
}

impl<'a> Materializer<'a> {
    /// Create a materializer with the session configuration.
    pub fn new(config: &'a FlyttaConfig) -> Self {
        Self { config }
    }

    /// Apply one move: `method` is the rewritten declaration for the target,
    /// `stub` the delegating replacement for the source (`None` removes the
    /// declaration outright).
    pub fn apply(
        &self,
        workspace: &mut Workspace,
        operation: &MoveOperation,
        method: MethodDecl,
        stub: Option<MethodDecl>,
    ) -> Result<()> {
        let request = &operation.request;

        let source_path = workspace
            .unit_declaring(&request.source_scope)
            .map(PathBuf::from)
            .ok_or_else(|| {
                FlyttaError::internal(format!(
                    "planned move from undeclared scope '{}'",
                    request.source_scope
                ))
            })?;

        let target_path = self.ensure_target_unit(workspace, operation, &source_path)?;
        self.merge_imports(workspace, &source_path, &target_path)?;
        self.swap_source_member(workspace, &source_path, request, stub)?;
        self.install_on_target(workspace, &target_path, operation, method)?;

        debug!(
            member = %request.qualified_source(),
            target = %request.qualified_target(),
            "move materialized"
        );
        Ok(())
    }

    /// Unit that will hold the target scope, creating unit and type
    /// declaration as needed. An explicitly requested unit wins over the
    /// unit already declaring the scope.
    fn ensure_target_unit(
        &self,
        workspace: &mut Workspace,
        operation: &MoveOperation,
        source_path: &PathBuf,
    ) -> Result<PathBuf> {
        let request = &operation.request;

        let path = match &request.target_unit {
            Some(path) => path.clone(),
            None => match workspace.unit_declaring(&request.target_scope) {
                Some(existing) => existing.to_path_buf(),
                None => PathBuf::from(format!(
                    "{}{}",
                    request.target_scope, self.config.persistence.file_extension
                )),
            },
        };

        if workspace.unit(&path).is_none() {
            let namespace = workspace
                .unit(source_path)
                .and_then(|u| u.namespace.clone());
            let mut unit = SourceUnit::new(path.clone());
            unit.namespace = namespace;
            workspace.add_unit(unit);
            workspace.mark_dirty(&path);
            debug!(path = %path.display(), "target unit created");
        }

        let unit = workspace
            .unit_mut(&path)
            .ok_or_else(|| FlyttaError::internal("target unit vanished after creation"))?;
        if unit.type_decl(&request.target_scope).is_none() {
            unit.types.push(TypeDecl::new(request.target_scope.clone()));
        }
        Ok(path)
    }

    fn merge_imports(
        &self,
        workspace: &mut Workspace,
        source_path: &PathBuf,
        target_path: &PathBuf,
    ) -> Result<()> {
        if source_path == target_path {
            return Ok(());
        }
        let imports = workspace
            .unit(source_path)
            .map(|u| u.imports.clone())
            .unwrap_or_default();
        if imports.is_empty() {
            return Ok(());
        }
        let target = workspace
            .unit_mut(target_path)
            .ok_or_else(|| FlyttaError::internal("target unit vanished during import merge"))?;
        for import in &imports {
            target.merge_import(import);
        }
        Ok(())
    }

    /// Replace the source declaration with the stub at the same member index,
    /// or remove it entirely under the propagate strategy.
    fn swap_source_member(
        &self,
        workspace: &mut Workspace,
        source_path: &PathBuf,
        request: &crate::relocate::request::MoveRequest,
        stub: Option<MethodDecl>,
    ) -> Result<()> {
        let unit = workspace
            .unit_mut(source_path)
            .ok_or_else(|| FlyttaError::internal("source unit vanished during move"))?;
        let ty = unit
            .type_decl_mut(&request.source_scope)
            .ok_or_else(|| FlyttaError::internal("source scope vanished during move"))?;
        let index = ty
            .members
            .iter()
            .position(|m| m.name() == request.member)
            .ok_or_else(|| FlyttaError::internal("moved member vanished during move"))?;

        match stub {
            Some(stub) => ty.members[index] = Member::Method(stub),
            None => {
                ty.members.remove(index);
            }
        }
        Ok(())
    }

    fn install_on_target(
        &self,
        workspace: &mut Workspace,
        target_path: &PathBuf,
        operation: &MoveOperation,
        method: MethodDecl,
    ) -> Result<()> {
        let request = &operation.request;
        let unit = workspace
            .unit_mut(target_path)
            .ok_or_else(|| FlyttaError::internal("target unit vanished during move"))?;
        let ty = unit
            .type_decl_mut(&request.target_scope)
            .ok_or_else(|| FlyttaError::internal("target scope vanished during move"))?;

        // A missing field anchor is materialized ahead of the method so the
        // rendered declaration order matches field-before-method convention.
        if operation.create_anchor_field {
            if let AnchorSpec::Field { name } = &request.anchor {
                // Two batch members sharing one new anchor materialize it once.
                if ty.field(name).is_none() {
                    let field = FieldDecl::new(name.clone(), request.source_scope.clone())
                        .with_visibility(Visibility::Public);
                    let first_method = ty
                        .members
                        .iter()
                        .position(|m| matches!(m, Member::Method(_)))
                        .unwrap_or(ty.members.len());
                    ty.members.insert(first_method, Member::Field(field));
                }
            }
        }

        ty.members.push(Member::Method(method));
        Ok(())
    }
}
