//! Dependency graph over one batch's move candidates, and the deterministic
//! execution order derived from it.
//!
//! An edge A → B means A's body references B, with both in the batch; B must
//! be finalized before A. Mutual recursion collapses into one co-move unit
//! whose members are relocated atomically, qualified by their precomputed
//! final names instead of move order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{Graph, NodeIndex};
use tracing::debug;

use crate::core::errors::Result;
use crate::semantic::model::SemanticModel;
use crate::semantic::symbols::SymbolId;

/// One step of the execution order: a single move, or a strongly-connected
/// group co-moved as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveUnit {
    /// Candidate indices (into the batch), declaration order within the unit
    pub members: Vec<usize>,
    /// True when the unit is a cycle of mutually recursive members
    pub cyclic: bool,
}

/// The batch dependency graph plus its execution order.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// (dependent, dependency) pairs among candidates
    pub edges: Vec<(usize, usize)>,
    /// Units in execution order: dependencies before dependents
    pub units: Vec<MoveUnit>,
}

impl DependencyGraph {
    /// Build the graph for `candidates` (the resolved symbol of each batch
    /// member, in batch order) and compute the execution order.
    ///
    /// Ordering is topological over the SCC condensation. Ties are broken by
    /// original declaration order, which symbol ids preserve, so the same
    /// batch always yields the same order.
    pub fn build(model: &SemanticModel, candidates: &[SymbolId]) -> Result<Self> {
        let by_symbol: HashMap<SymbolId, usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, sym)| (*sym, i))
            .collect();

        let mut graph: Graph<usize, ()> = Graph::new();
        let nodes: Vec<NodeIndex> = (0..candidates.len()).map(|i| graph.add_node(i)).collect();

        let mut edges = Vec::new();
        for (dependency_idx, symbol) in candidates.iter().enumerate() {
            for reference in model.references(*symbol) {
                // The referencing site must itself be a candidate body.
                let referrer = model
                    .member_symbol(&reference.scope, &reference.member)
                    .map(|s| s.id)
                    .and_then(|id| by_symbol.get(&id).copied());
                if let Some(dependent_idx) = referrer {
                    if dependent_idx != dependency_idx
                        && !edges.contains(&(dependent_idx, dependency_idx))
                    {
                        edges.push((dependent_idx, dependency_idx));
                        graph.add_edge(nodes[dependent_idx], nodes[dependency_idx], ());
                    }
                }
            }
        }

        let units = execution_order(&graph, candidates, &edges);
        debug!(
            candidates = candidates.len(),
            edges = edges.len(),
            units = units.len(),
            "dependency graph built"
        );
        Ok(Self { edges, units })
    }

    /// Candidate indices of every cyclic unit, for batch reports.
    pub fn cycle_groups(&self) -> Vec<&MoveUnit> {
        self.units.iter().filter(|u| u.cyclic).collect()
    }
}

fn execution_order(
    graph: &Graph<usize, ()>,
    candidates: &[SymbolId],
    edges: &[(usize, usize)],
) -> Vec<MoveUnit> {
    // Condense to strongly-connected components; each component is one unit.
    let sccs = kosaraju_scc(graph);

    let mut comp_of = vec![0usize; candidates.len()];
    let mut components: Vec<Vec<usize>> = Vec::with_capacity(sccs.len());
    for (c, scc) in sccs.iter().enumerate() {
        let mut members: Vec<usize> = scc.iter().map(|n| graph[*n]).collect();
        // Declaration order within a unit.
        members.sort_by_key(|i| candidates[*i]);
        for member in &members {
            comp_of[*member] = c;
        }
        components.push(members);
    }

    // Dependencies of each component, self-loops removed.
    let mut comp_deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
    for (dependent, dependency) in edges {
        let (a, b) = (comp_of[*dependent], comp_of[*dependency]);
        if a != b {
            comp_deps[a].insert(b);
        }
    }

    // Kahn's algorithm, emitting the ready component whose earliest-declared
    // member comes first.
    let mut pending: BTreeMap<SymbolId, usize> = components
        .iter()
        .enumerate()
        .map(|(c, members)| (candidates[members[0]], c))
        .collect();
    let mut emitted = vec![false; components.len()];
    let mut units = Vec::with_capacity(components.len());

    // The condensation is acyclic, so a ready component exists until the
    // pending set is drained.
    while let Some((key, component)) = pending
        .iter()
        .find(|(_, c)| comp_deps[**c].iter().all(|d| emitted[*d]))
        .map(|(key, c)| (*key, *c))
    {
        pending.remove(&key);
        emitted[component] = true;
        let members = components[component].clone();
        let cyclic = members.len() > 1;
        units.push(MoveUnit { members, cyclic });
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::expr::{Arg, Expr, Stmt};
    use crate::syntax::tree::{Member, MethodDecl, SourceUnit, TypeDecl};
    use crate::workspace::snapshot::Workspace;

    /// `S` with methods that call one another per `calls`.
    fn workspace_with_calls(methods: &[(&str, &[&str])]) -> Workspace {
        let mut ty = TypeDecl::new("S");
        for (name, calls) in methods {
            let body = calls
                .iter()
                .map(|callee| {
                    Stmt::Expr(Expr::invoke(Expr::ident(*callee), vec![Arg::positional(
                        Expr::int(0),
                    )]))
                })
                .collect();
            ty = ty.with_member(Member::Method(
                MethodDecl::new(*name, "void").with_body(body),
            ));
        }
        let mut ws = Workspace::new();
        ws.add_unit(SourceUnit::new("S.cs").with_type(ty));
        ws
    }

    fn order_of(ws: &Workspace, names: &[&str]) -> (DependencyGraph, Vec<String>) {
        let model = SemanticModel::analyze(ws).unwrap();
        let candidates: Vec<SymbolId> = names
            .iter()
            .map(|n| model.member_symbol("S", n).unwrap().id)
            .collect();
        let graph = DependencyGraph::build(&model, &candidates).unwrap();
        let order = graph
            .units
            .iter()
            .flat_map(|u| u.members.iter().map(|i| names[*i].to_string()))
            .collect();
        (graph, order)
    }

    #[test]
    fn test_dependency_before_dependent() {
        let ws = workspace_with_calls(&[("M1", &["M2"]), ("M2", &[])]);
        let (graph, order) = order_of(&ws, &["M1", "M2"]);

        assert_eq!(graph.edges, vec![(0, 1)]);
        assert_eq!(order, vec!["M2", "M1"]);
    }

    #[test]
    fn test_independent_candidates_keep_declaration_order() {
        let ws = workspace_with_calls(&[("A", &[]), ("B", &[]), ("C", &[])]);
        // Batch order scrambled; declaration order must win.
        let (_, order) = order_of(&ws, &["C", "A", "B"]);
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_cycle_collapses_to_one_unit() {
        let ws = workspace_with_calls(&[("M1", &["M2"]), ("M2", &["M1"]), ("M3", &["M1"])]);
        let (graph, order) = order_of(&ws, &["M1", "M2", "M3"]);

        assert_eq!(order, vec!["M1", "M2", "M3"]);
        let cycles = graph.cycle_groups();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].members, vec![0, 1]);
        assert!(cycles[0].cyclic);
    }

    #[test]
    fn test_references_outside_batch_add_no_edges() {
        let ws = workspace_with_calls(&[("M1", &["Helper"]), ("Helper", &[]), ("M2", &[])]);
        let (graph, order) = order_of(&ws, &["M1", "M2"]);
        assert!(graph.edges.is_empty());
        assert_eq!(order, vec!["M1", "M2"]);
    }
}
