//! Move requests, anchors, and wrapper strategies.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a relocated instance method regains the implicit access it had to its
/// source scope. The choice is a caller-supplied design decision, never
/// inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "anchor", rename_all = "snake_case")]
pub enum AnchorSpec {
    /// No anchor: the member is static and needs none.
    None,
    /// Add a leading parameter of the source type; every call site supplies
    /// an instance, and the relocated method becomes static on the target.
    Parameter {
        /// Parameter name
        name: String,
    },
    /// Reuse or create a field in the target holding one specific source
    /// instance; the relocated method stays an instance member.
    Field {
        /// Field name
        name: String,
    },
}

impl AnchorSpec {
    /// Anchor name, when one exists.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Parameter { name } | Self::Field { name } => Some(name),
        }
    }

    /// Short description for reports and logs.
    pub fn describe(&self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::Parameter { name } => format!("parameter '{name}'"),
            Self::Field { name } => format!("field '{name}'"),
        }
    }
}

/// How call sites outside the moved bodies are kept compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapperStrategy {
    /// Leave a delegating stub of identical name and signature in the source
    /// scope; zero changes at other call sites.
    #[default]
    DelegatingStub,
    /// Rewrite every call site to the relocated shape and leave no stub.
    PropagateCallSites,
}

/// One planned relocation. Created per user-specified move and consumed
/// exactly once by a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Scope currently declaring the member
    pub source_scope: String,
    /// Member to move
    pub member: String,
    /// Destination scope
    pub target_scope: String,
    /// Anchor choice
    pub anchor: AnchorSpec,
    /// Unit to host the target scope when it must be created; defaults to a
    /// new `<TargetScope>.cs` sibling of the source unit
    pub target_unit: Option<PathBuf>,
}

impl MoveRequest {
    /// Create a move request.
    pub fn new(
        source_scope: impl Into<String>,
        member: impl Into<String>,
        target_scope: impl Into<String>,
        anchor: AnchorSpec,
    ) -> Self {
        Self {
            source_scope: source_scope.into(),
            member: member.into(),
            target_scope: target_scope.into(),
            anchor,
            target_unit: None,
        }
    }

    /// Set the unit that hosts the target scope if it must be created.
    pub fn with_target_unit(mut self, unit: impl Into<PathBuf>) -> Self {
        self.target_unit = Some(unit.into());
        self
    }

    /// `Source.Member` for diagnostics.
    pub fn qualified_source(&self) -> String {
        format!("{}.{}", self.source_scope, self.member)
    }

    /// `Target.Member`: the member's final qualified name after the move.
    pub fn qualified_target(&self) -> String {
        format!("{}.{}", self.target_scope, self.member)
    }
}

/// An ordered set of move requests executed as one atomic transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveBatchRequest {
    /// Requested moves, in user order
    pub moves: Vec<MoveRequest>,
    /// Call-site strategy override; the configured default applies when unset
    #[serde(default)]
    pub strategy: Option<WrapperStrategy>,
}

impl MoveBatchRequest {
    /// Create a batch that runs under the configured default strategy.
    pub fn new(moves: Vec<MoveRequest>) -> Self {
        Self {
            moves,
            strategy: None,
        }
    }

    /// Override the call-site strategy for this batch.
    pub fn with_strategy(mut self, strategy: WrapperStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_names() {
        let req = MoveRequest::new("Inventory", "Tally", "Reporting", AnchorSpec::None);
        assert_eq!(req.qualified_source(), "Inventory.Tally");
        assert_eq!(req.qualified_target(), "Reporting.Tally");
    }

    #[test]
    fn test_anchor_describe() {
        assert_eq!(AnchorSpec::None.describe(), "none");
        assert_eq!(
            AnchorSpec::Field {
                name: "inv".into()
            }
            .describe(),
            "field 'inv'"
        );
    }

    #[test]
    fn test_new_batch_defers_to_configured_strategy() {
        let batch = MoveBatchRequest::new(vec![]);
        assert_eq!(batch.strategy, None);
        let batch = batch.with_strategy(WrapperStrategy::PropagateCallSites);
        assert_eq!(batch.strategy, Some(WrapperStrategy::PropagateCallSites));
    }
}
