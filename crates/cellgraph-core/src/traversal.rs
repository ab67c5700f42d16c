//! Transitive dependency and dependent search
//!
//! Both directions follow `DependsOn` edges only; `Contains` edges never take
//! part in reachability. The search is an iterative depth-first walk with a
//! visited set, so it terminates on cycles and does not grow the call stack
//! with the length of a dependency chain.

use crate::graph::{Adjacency, EdgeKind, Graph, NodeIx};
use std::collections::BTreeSet;

/// Which way to follow `DependsOn` edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Outgoing edges: cells the start cell reads
    Dependencies,
    /// Incoming edges: cells that read the start cell
    Dependents,
}

impl Graph {
    /// Every cell `id` depends on, directly or transitively
    ///
    /// `id` itself is only part of the result when a cycle leads back to it.
    /// Unknown ids give an empty set.
    pub fn transitive_dependencies(&self, id: &str) -> BTreeSet<&str> {
        self.reachable(id, Direction::Dependencies)
    }

    /// Every cell whose value is affected, directly or transitively, by a
    /// change to `id`
    pub fn transitive_dependents(&self, id: &str) -> BTreeSet<&str> {
        self.reachable(id, Direction::Dependents)
    }

    /// Cells `id` references directly
    pub fn direct_dependencies(&self, id: &str) -> BTreeSet<&str> {
        self.neighbours(id, Direction::Dependencies)
    }

    /// Cells referencing `id` directly
    pub fn direct_dependents(&self, id: &str) -> BTreeSet<&str> {
        self.neighbours(id, Direction::Dependents)
    }

    /// Whether `id` reaches itself through its dependencies
    pub fn is_circular(&self, id: &str) -> bool {
        self.transitive_dependencies(id).contains(id)
    }

    /// Reachability over `DependsOn` edges in `direction`
    pub fn reachable(&self, id: &str, direction: Direction) -> BTreeSet<&str> {
        let Some(start) = self.ix_of(id) else {
            return BTreeSet::new();
        };

        let mut visited = vec![false; self.node_count()];
        visited[start.index()] = true;

        let mut stack = vec![start];
        let mut found = Vec::new();
        let mut returns_to_start = false;

        while let Some(ix) = stack.pop() {
            for next in depends_on(self.adjacency(ix, direction)) {
                if next == start {
                    returns_to_start = true;
                } else if !visited[next.index()] {
                    visited[next.index()] = true;
                    found.push(next);
                    stack.push(next);
                }
            }
        }

        if returns_to_start {
            found.push(start);
        }

        found.into_iter().map(|ix| self.id_at(ix)).collect()
    }

    fn neighbours(&self, id: &str, direction: Direction) -> BTreeSet<&str> {
        self.ix_of(id)
            .map(|ix| {
                depends_on(self.adjacency(ix, direction))
                    .map(|n| self.id_at(n))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn adjacency(&self, ix: NodeIx, direction: Direction) -> &Adjacency {
        match direction {
            Direction::Dependencies => self.forward_of(ix),
            Direction::Dependents => self.reverse_of(ix),
        }
    }

    fn id_at(&self, ix: NodeIx) -> &str {
        self.node(ix).map_or("", |n| n.id())
    }
}

fn depends_on(adjacency: &Adjacency) -> impl Iterator<Item = NodeIx> + '_ {
    adjacency
        .iter()
        .filter(|(kind, _)| *kind == EdgeKind::DependsOn)
        .map(|&(_, ix)| ix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{CellNode, SheetNode};
    use pretty_assertions::assert_eq;

    /// One sheet with cells in row 1; `deps` lists (from_col, to_col) DependsOn pairs
    fn row_graph(columns: u32, deps: &[(u32, u32)]) -> Graph {
        let mut graph = Graph::new();
        graph.put(SheetNode::new("S"));
        for col in 1..=columns {
            let cell = CellNode::new("S", 1, col, "", None);
            let id = cell.id().to_string();
            graph.put(cell);
            graph.add_edge("S", &id, EdgeKind::Contains);
        }
        for &(from, to) in deps {
            let from = CellNode::new("S", 1, from, "", None);
            let to = CellNode::new("S", 1, to, "", None);
            graph.add_edge(from.id(), to.id(), EdgeKind::DependsOn);
        }
        graph
    }

    fn set<'a>(ids: &[&'a str]) -> BTreeSet<&'a str> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_chain() {
        // B1 reads A1, C1 reads B1
        let graph = row_graph(3, &[(2, 1), (3, 2)]);

        assert_eq!(graph.transitive_dependents("S!A1"), set(&["S!B1", "S!C1"]));
        assert_eq!(graph.transitive_dependencies("S!C1"), set(&["S!A1", "S!B1"]));
        assert_eq!(graph.direct_dependencies("S!C1"), set(&["S!B1"]));
        assert_eq!(graph.direct_dependents("S!A1"), set(&["S!B1"]));
        assert!(graph.transitive_dependencies("S!A1").is_empty());
    }

    #[test]
    fn test_contains_edges_are_not_followed() {
        let graph = row_graph(2, &[(2, 1)]);

        assert!(graph.transitive_dependencies("S").is_empty());
        assert_eq!(graph.transitive_dependents("S!A1"), set(&["S!B1"]));
    }

    #[test]
    fn test_two_cycle_includes_start() {
        let graph = row_graph(2, &[(1, 2), (2, 1)]);

        assert_eq!(graph.transitive_dependencies("S!A1"), set(&["S!A1", "S!B1"]));
        assert_eq!(graph.transitive_dependents("S!B1"), set(&["S!A1", "S!B1"]));
        assert!(graph.is_circular("S!A1"));
    }

    #[test]
    fn test_long_cycle_terminates() {
        let n = 5_000;
        let mut deps: Vec<(u32, u32)> = (1..n).map(|c| (c, c + 1)).collect();
        deps.push((n, 1));
        let graph = row_graph(n, &deps);

        assert_eq!(graph.transitive_dependencies("S!A1").len(), n as usize);
        assert_eq!(graph.transitive_dependents("S!A1").len(), n as usize);
    }

    #[test]
    fn test_diamond_has_no_duplicates() {
        // D reads B and C, both read A
        let graph = row_graph(4, &[(2, 1), (3, 1), (4, 2), (4, 3)]);

        assert_eq!(
            graph.transitive_dependencies("S!D1"),
            set(&["S!A1", "S!B1", "S!C1"])
        );
        assert!(!graph.is_circular("S!D1"));
    }

    #[test]
    fn test_unknown_id() {
        let graph = row_graph(1, &[]);

        assert!(graph.transitive_dependencies("NoSuchSheet!Z9").is_empty());
        assert!(graph.transitive_dependents("NoSuchSheet!Z9").is_empty());
        assert!(graph.direct_dependents("NoSuchSheet!Z9").is_empty());
    }
}
