//! Batch reports and related result structures for public API consumption.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::Result;
use crate::relocate::request::WrapperStrategy;

/// What happened to one moved member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveReport {
    /// Qualified origin, `Source.Member`
    pub source: String,

    /// Qualified destination, `Target.Member`
    pub target: String,

    /// Human-readable anchor description
    pub anchor: String,

    /// References rewritten inside the moved body
    pub references_rewritten: usize,

    /// Whether a delegating stub was left at the origin
    pub stubbed: bool,

    /// Whether the target scope was created by this move
    pub target_created: bool,

    /// Whether a field anchor was materialized on the target
    pub anchor_field_created: bool,
}

/// Report for one executed move batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique id of this batch execution
    pub batch_id: Uuid,

    /// When execution started
    pub started_at: DateTime<Utc>,

    /// When the workspace swap completed
    pub completed_at: DateTime<Utc>,

    /// Call-site strategy the batch ran under
    pub strategy: WrapperStrategy,

    /// Qualified member names in the order they were moved
    pub execution_order: Vec<String>,

    /// Mutually-recursive groups that moved as one atomic unit, each listed
    /// in declaration order
    pub cycle_groups: Vec<Vec<String>>,

    /// Per-member outcomes, in execution order
    pub moves: Vec<MoveReport>,

    /// Call sites rewritten across the workspace (propagate strategy only)
    pub call_sites_rewritten: usize,

    /// Units modified by this batch, in path order
    pub units_touched: Vec<PathBuf>,
}

impl BatchReport {
    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "moved {} member(s) across {} unit(s) ({} cyclic group(s), {} call site(s) rewritten) in {}ms",
            self.moves.len(),
            self.units_touched.len(),
            self.cycle_groups.len(),
            self.call_sites_rewritten,
            (self.completed_at - self.started_at).num_milliseconds()
        )
    }

    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Outcome of inlining a delegating stub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineStubReport {
    /// Qualified stub that was removed, `Source.Member`
    pub stub: String,

    /// Qualified member calls now reach directly
    pub target: String,

    /// Call sites rewritten to the relocated shape
    pub call_sites_rewritten: usize,
}

/// Outcome of a safe delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeDeleteReport {
    /// Qualified member that was removed
    pub member: String,

    /// Kind of the removed member
    pub kind: String,
}

/// Outcome of an instance-to-static conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeStaticReport {
    /// Qualified converted member
    pub member: String,

    /// Name of the injected leading parameter
    pub parameter: String,

    /// References rewritten inside the converted body
    pub references_rewritten: usize,

    /// Call sites updated across the workspace
    pub call_sites_rewritten: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BatchReport {
        BatchReport {
            batch_id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            strategy: WrapperStrategy::DelegatingStub,
            execution_order: vec!["Inventory.Tally".into()],
            cycle_groups: vec![],
            moves: vec![MoveReport {
                source: "Inventory.Tally".into(),
                target: "Reporting.Tally".into(),
                anchor: "field anchor 'inv'".into(),
                references_rewritten: 3,
                stubbed: true,
                target_created: false,
                anchor_field_created: true,
            }],
            call_sites_rewritten: 0,
            units_touched: vec!["Inventory.cs".into(), "Reporting.cs".into()],
        }
    }

    #[test]
    fn test_summary_counts() {
        let report = sample();
        let summary = report.summary();
        assert!(summary.contains("moved 1 member(s)"));
        assert!(summary.contains("0 cyclic group(s)"));
    }

    #[test]
    fn test_json_roundtrip() {
        let report = sample();
        let json = report.to_json().unwrap();
        let back: BatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.moves[0].target, "Reporting.Tally");
        assert_eq!(back.batch_id, report.batch_id);
    }
}
