//! Conflict Guard: whole-batch pre-flight validation.
//!
//! Runs after planning and before any mutation. A failed guard aborts the
//! entire batch with zero units modified; per-request conditions (missing
//! members, wrong anchor types against *existing* declarations) are the
//! planner's job, while the guard catches conflicts between the planned
//! operations themselves.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::core::errors::{FlyttaError, Result};
use crate::relocate::planner::MoveOperation;
use crate::relocate::request::AnchorSpec;

/// What a planned operation will add to a target scope.
#[derive(Debug, Clone, PartialEq)]
enum PlannedMember {
    Method,
    AnchorField { source_ty: String },
}

/// Validates one batch of planned operations.
#[derive(Debug, Default)]
pub struct ConflictGuard;

impl ConflictGuard {
    /// Create a guard.
    pub fn new() -> Self {
        Self
    }

    /// Reject the batch on duplicate targets or intra-batch collisions.
    pub fn check(&self, operations: &[MoveOperation]) -> Result<()> {
        let mut sources: HashSet<(String, String)> = HashSet::new();
        let mut planned: HashMap<String, HashMap<String, PlannedMember>> = HashMap::new();

        for op in operations {
            let request = &op.request;
            if !sources.insert((request.source_scope.clone(), request.member.clone())) {
                warn!(member = %request.qualified_source(), "member targeted twice in one batch");
                return Err(FlyttaError::validation(format!(
                    "'{}' is targeted by more than one move in this batch",
                    request.qualified_source()
                )));
            }

            let additions = planned.entry(request.target_scope.clone()).or_default();

            if let Some(existing) = additions.get(&request.member) {
                return Err(FlyttaError::name_collision(
                    &request.target_scope,
                    &request.member,
                    match existing {
                        PlannedMember::Method => "method planned by this batch",
                        PlannedMember::AnchorField { .. } => "anchor field planned by this batch",
                    },
                ));
            }
            additions.insert(request.member.clone(), PlannedMember::Method);

            if let AnchorSpec::Field { name } = &request.anchor {
                match additions.get(name) {
                    None => {
                        additions.insert(
                            name.clone(),
                            PlannedMember::AnchorField {
                                source_ty: request.source_scope.clone(),
                            },
                        );
                    }
                    Some(PlannedMember::AnchorField { source_ty })
                        if *source_ty == request.source_scope =>
                    {
                        // Two moves from one source share the anchor field.
                    }
                    Some(PlannedMember::AnchorField { source_ty }) => {
                        return Err(FlyttaError::type_mismatch(
                            &request.target_scope,
                            name.clone(),
                            &request.source_scope,
                            source_ty.clone(),
                        ));
                    }
                    Some(PlannedMember::Method) => {
                        return Err(FlyttaError::name_collision(
                            &request.target_scope,
                            name.clone(),
                            "method planned by this batch",
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}
