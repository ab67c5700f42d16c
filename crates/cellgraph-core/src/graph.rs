//! Node store and edge index
//!
//! [`Graph`] is an arena: nodes live in a `Vec` and are addressed by
//! [`NodeIx`]; an id map gives lookup by string identifier. Forward and
//! reverse adjacency are parallel vectors indexed the same way, so an edge
//! is always recorded on both sides in a single call.

use crate::node::{CellNode, Node, NodeKind, SheetNode};
use ahash::{AHashMap, AHashSet};
use std::fmt;

/// Position of a node inside a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIx(u32);

impl NodeIx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Edge type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Sheet → cell ownership
    Contains,
    /// Formula cell → referenced cell
    DependsOn,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Contains => f.write_str("CONTAINS"),
            EdgeKind::DependsOn => f.write_str("DEPENDS_ON"),
        }
    }
}

pub(crate) type Adjacency = AHashSet<(EdgeKind, NodeIx)>;

/// Sheets, cells and the typed edges between them
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    ids: AHashMap<String, NodeIx>,
    forward: Vec<Adjacency>,
    reverse: Vec<Adjacency>,
    edge_count: usize,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any node with the same id
    ///
    /// A replaced node keeps its position and its existing edges.
    pub fn put(&mut self, node: impl Into<Node>) -> NodeIx {
        let node = node.into();

        if let Some(&ix) = self.ids.get(node.id()) {
            tracing::trace!(id = node.id(), "replacing node");
            self.nodes[ix.index()] = node;
            return ix;
        }

        let ix = NodeIx(self.nodes.len() as u32);
        self.ids.insert(node.id().to_string(), ix);
        self.nodes.push(node);
        self.forward.push(Adjacency::default());
        self.reverse.push(Adjacency::default());
        ix
    }

    /// Add a typed edge between two existing nodes
    ///
    /// Returns `false` (and logs) when either endpoint is unknown; the edge
    /// is dropped in that case. Adding an edge that already exists is a
    /// no-op returning `true`.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) -> bool {
        let (Some(&s), Some(&t)) = (self.ids.get(source), self.ids.get(target)) else {
            tracing::warn!(source, target, %kind, "dropping edge: endpoint not in graph");
            return false;
        };

        if self.forward[s.index()].insert((kind, t)) {
            self.reverse[t.index()].insert((kind, s));
            self.edge_count += 1;
            tracing::debug!(source, target, %kind, "added edge");
        }
        true
    }

    /// Discard all nodes and edges
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.ids.clear();
        self.forward.clear();
        self.reverse.clear();
        self.edge_count = 0;
    }

    // === Lookups ===

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.ix_of(id).map(|ix| &self.nodes[ix.index()])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn cell(&self, id: &str) -> Option<&CellNode> {
        self.get(id).and_then(Node::as_cell)
    }

    pub fn sheet(&self, id: &str) -> Option<&SheetNode> {
        self.get(id).and_then(Node::as_sheet)
    }

    pub fn ix_of(&self, id: &str) -> Option<NodeIx> {
        self.ids.get(id).copied()
    }

    pub fn node(&self, ix: NodeIx) -> Option<&Node> {
        self.nodes.get(ix.index())
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    /// Sheets in the order they were first inserted
    pub fn sheets(&self) -> impl Iterator<Item = &SheetNode> + '_ {
        self.nodes.iter().filter_map(Node::as_sheet)
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellNode> + '_ {
        self.nodes.iter().filter_map(Node::as_cell)
    }

    pub fn formula_cells(&self) -> impl Iterator<Item = &CellNode> + '_ {
        self.cells().filter(|c| c.has_formula())
    }

    /// Cells owned by `sheet` through `Contains` edges, in no particular order
    pub fn cells_in_sheet<'a>(&'a self, sheet: &str) -> impl Iterator<Item = &'a CellNode> + 'a {
        self.ix_of(sheet)
            .filter(|ix| self.nodes[ix.index()].kind() == NodeKind::Sheet)
            .into_iter()
            .flat_map(move |ix| self.forward[ix.index()].iter())
            .filter(|(kind, _)| *kind == EdgeKind::Contains)
            .filter_map(move |&(_, cell)| self.nodes[cell.index()].as_cell())
    }

    /// Outgoing edges of `id` as `(kind, target id)`
    pub fn forward_edges_of<'a>(&'a self, id: &str) -> impl Iterator<Item = (EdgeKind, &'a str)> + 'a {
        self.ix_of(id)
            .into_iter()
            .flat_map(move |ix| self.forward[ix.index()].iter())
            .map(move |&(kind, t)| (kind, self.nodes[t.index()].id()))
    }

    /// Incoming edges of `id` as `(kind, source id)`
    pub fn reverse_edges_of<'a>(&'a self, id: &str) -> impl Iterator<Item = (EdgeKind, &'a str)> + 'a {
        self.ix_of(id)
            .into_iter()
            .flat_map(move |ix| self.reverse[ix.index()].iter())
            .map(move |&(kind, s)| (kind, self.nodes[s.index()].id()))
    }

    /// Every edge as `(kind, source id, target id)`
    pub fn edges(&self) -> impl Iterator<Item = (EdgeKind, &str, &str)> + '_ {
        self.forward.iter().enumerate().flat_map(move |(s, targets)| {
            targets
                .iter()
                .map(move |&(kind, t)| (kind, self.nodes[s].id(), self.nodes[t.index()].id()))
        })
    }

    pub(crate) fn forward_of(&self, ix: NodeIx) -> &Adjacency {
        &self.forward[ix.index()]
    }

    pub(crate) fn reverse_of(&self, ix: NodeIx) -> &Adjacency {
        &self.reverse[ix.index()]
    }

    // === Aggregates ===

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges of both kinds
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn edge_count_of(&self, kind: EdgeKind) -> usize {
        self.forward
            .iter()
            .map(|targets| targets.iter().filter(|(k, _)| *k == kind).count())
            .sum()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets().count()
    }

    pub fn cell_count(&self) -> usize {
        self.cells().count()
    }

    pub fn formula_count(&self) -> usize {
        self.formula_cells().count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Graph {
        let mut graph = Graph::new();
        graph.put(SheetNode::new("Sheet1"));
        graph.put(CellNode::new("Sheet1", 1, 1, "10", None));
        graph.put(CellNode::new("Sheet1", 1, 2, "", Some("=A1*2".into())));
        graph.add_edge("Sheet1", "Sheet1!A1", EdgeKind::Contains);
        graph.add_edge("Sheet1", "Sheet1!B1", EdgeKind::Contains);
        graph.add_edge("Sheet1!B1", "Sheet1!A1", EdgeKind::DependsOn);
        graph
    }

    #[test]
    fn test_put_and_lookup() {
        let graph = sample();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.sheet_count(), 1);
        assert_eq!(graph.cell_count(), 2);
        assert_eq!(graph.formula_count(), 1);
        assert_eq!(graph.cell("Sheet1!B1").map(|c| c.value()), Some(""));
        assert!(graph.cell("Sheet1").is_none());
        assert!(graph.sheet("Sheet1").is_some());
        assert!(graph.get("Sheet2!A1").is_none());
    }

    #[test]
    fn test_put_replaces_existing_id() {
        let mut graph = sample();
        let before = graph.ix_of("Sheet1!A1");

        let ix = graph.put(CellNode::new("Sheet1", 1, 1, "99", None));

        assert_eq!(Some(ix), before);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.cell("Sheet1!A1").map(|c| c.value()), Some("99"));
        // edges survive replacement
        assert_eq!(graph.reverse_edges_of("Sheet1!A1").count(), 2);
    }

    #[test]
    fn test_edges_are_bidirectional() {
        let graph = sample();

        let forward: Vec<_> = graph
            .forward_edges_of("Sheet1!B1")
            .filter(|(k, _)| *k == EdgeKind::DependsOn)
            .collect();
        assert_eq!(forward, vec![(EdgeKind::DependsOn, "Sheet1!A1")]);

        let mut reverse: Vec<_> = graph.reverse_edges_of("Sheet1!A1").collect();
        reverse.sort();
        assert_eq!(
            reverse,
            vec![
                (EdgeKind::Contains, "Sheet1"),
                (EdgeKind::DependsOn, "Sheet1!B1"),
            ]
        );
    }

    #[test]
    fn test_dangling_edge_is_dropped() {
        let mut graph = sample();

        assert!(!graph.add_edge("Sheet1!B1", "Sheet9!Z9", EdgeKind::DependsOn));
        assert!(!graph.add_edge("Nope!A1", "Sheet1!A1", EdgeKind::DependsOn));
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_duplicate_edge_counts_once() {
        let mut graph = sample();

        assert!(graph.add_edge("Sheet1!B1", "Sheet1!A1", EdgeKind::DependsOn));
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.edge_count_of(EdgeKind::DependsOn), 1);
        assert_eq!(graph.edge_count_of(EdgeKind::Contains), 2);
        assert_eq!(graph.edges().count(), 3);
    }

    #[test]
    fn test_cells_in_sheet() {
        let mut graph = sample();
        graph.put(SheetNode::new("Other"));
        graph.put(CellNode::new("Other", 1, 1, "x", None));
        graph.add_edge("Other", "Other!A1", EdgeKind::Contains);

        let mut ids: Vec<_> = graph.cells_in_sheet("Sheet1").map(|c| c.id()).collect();
        ids.sort();
        assert_eq!(ids, vec!["Sheet1!A1", "Sheet1!B1"]);
        assert_eq!(graph.cells_in_sheet("Missing").count(), 0);
        // a cell id is not a sheet
        assert_eq!(graph.cells_in_sheet("Sheet1!A1").count(), 0);
    }

    #[test]
    fn test_clear() {
        let mut graph = sample();
        graph.clear();

        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.get("Sheet1").is_none());
    }
}
