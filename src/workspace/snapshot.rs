//! The in-memory loaded program: source units, node-id allocation, and
//! dirty-unit tracking.
//!
//! A workspace is the unit of atomicity for a batch: execution mutates a
//! working clone and swaps it in only when every planned move succeeded.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::syntax::tree::{NodeId, SourceUnit};

/// One loaded program snapshot.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    units: IndexMap<PathBuf, SourceUnit>,
    next_id: u32,
    dirty: BTreeSet<PathBuf>,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit, numbering every unassigned node id it carries. Added
    /// units start clean; mutation marks them dirty.
    pub fn add_unit(&mut self, mut unit: SourceUnit) {
        self.number(&mut unit);
        self.units.insert(unit.path.clone(), unit);
    }

    /// Units in insertion order.
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.values()
    }

    /// Number of loaded units.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Look up a unit by path.
    pub fn unit(&self, path: &Path) -> Option<&SourceUnit> {
        self.units.get(path)
    }

    /// Look up a unit mutably, marking it dirty.
    pub fn unit_mut(&mut self, path: &Path) -> Option<&mut SourceUnit> {
        if let Some(unit) = self.units.get_mut(path) {
            self.dirty.insert(path.to_path_buf());
            Some(unit)
        } else {
            None
        }
    }

    /// Path of the unit declaring `type_name`, if any.
    pub fn unit_declaring(&self, type_name: &str) -> Option<&Path> {
        self.units
            .values()
            .find(|u| u.type_decl(type_name).is_some())
            .map(|u| u.path.as_path())
    }

    /// Mark a unit dirty without taking a mutable borrow.
    pub fn mark_dirty(&mut self, path: &Path) {
        if self.units.contains_key(path) {
            self.dirty.insert(path.to_path_buf());
        }
    }

    /// Paths of units mutated since the last [`clear_dirty`](Self::clear_dirty),
    /// in path order.
    pub fn dirty_units(&self) -> impl Iterator<Item = &Path> {
        self.dirty.iter().map(PathBuf::as_path)
    }

    /// True when any unit is dirty.
    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Forget dirty marks, typically after a successful persist.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Renumber every node synthesized since the last commit. Called once at
    /// the end of a successful batch so resolution maps built afterwards see
    /// unique ids.
    pub fn commit(&mut self) {
        let mut next = self.next_id;
        for unit in self.units.values_mut() {
            unit.visit_ids_mut(&mut |id| {
                if !id.is_assigned() {
                    *id = NodeId::new(next);
                    next += 1;
                }
            });
        }
        self.next_id = next;
    }

    fn number(&mut self, unit: &mut SourceUnit) {
        let mut next = self.next_id;
        unit.visit_ids_mut(&mut |id| {
            if !id.is_assigned() {
                *id = NodeId::new(next);
                next += 1;
            }
        });
        self.next_id = next;
    }
}
