//! Two-phase graph construction
//!
//! Phase 1 walks the sheets in order. Each sheet is fully materialized (sheet
//! node, cell nodes, `Contains` edges) before its formulas are scanned for
//! same-sheet references. Phase 2 runs once every sheet exists and resolves
//! sheet-qualified references, so a formula may point at a sheet that comes
//! later in the document.
//!
//! # Example
//!
//! ```rust
//! use cellgraph::{CellSnapshot, DocumentSnapshot, GraphBuilder, SheetSnapshot};
//!
//! let document = DocumentSnapshot::new(vec![SheetSnapshot::new(
//!     "Sheet1",
//!     vec![CellSnapshot::value(1, 1, "10"), CellSnapshot::formula(1, 2, "=A1*2")],
//! )]);
//!
//! let (graph, stats) = GraphBuilder::build(&document);
//! assert_eq!(stats.same_sheet_edges, 1);
//! assert!(graph.transitive_dependencies("Sheet1!B1").contains("Sheet1!A1"));
//! ```

use cellgraph_core::{
    CellAddress, CellNode, DocumentSnapshot, EdgeKind, Graph, SheetNode, SheetSnapshot,
};
use cellgraph_formula::{ReferenceResolver, ResolvedReferences};
use serde::Serialize;

/// Counters from one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Number of sheets loaded
    pub sheets: usize,
    /// Number of cells loaded
    pub cells: usize,
    /// Number of cells carrying a formula
    pub formula_cells: usize,
    /// `DependsOn` edges added in phase 1
    pub same_sheet_edges: usize,
    /// `DependsOn` edges added in phase 2
    pub cross_sheet_edges: usize,
    /// References that matched no cell
    pub dangling_references: usize,
    /// Cells dropped because their position is outside the sheet bounds
    pub skipped_cells: usize,
}

impl BuildStats {
    pub fn dependency_edges(&self) -> usize {
        self.same_sheet_edges + self.cross_sheet_edges
    }
}

/// Builds a [`Graph`] from a [`DocumentSnapshot`]
pub struct GraphBuilder;

impl GraphBuilder {
    /// Build a fresh graph
    pub fn build(document: &DocumentSnapshot) -> (Graph, BuildStats) {
        let mut graph = Graph::new();
        let stats = Self::rebuild(&mut graph, document);
        (graph, stats)
    }

    /// Clear `graph` and rebuild it from `document`
    pub fn rebuild(graph: &mut Graph, document: &DocumentSnapshot) -> BuildStats {
        graph.clear();
        let mut stats = BuildStats::default();

        for sheet in &document.sheets {
            Self::load_sheet(graph, sheet, &mut stats);
            Self::link_same_sheet(graph, &sheet.name, &mut stats);
        }

        Self::link_qualified(graph, &mut stats);

        stats.sheets = graph.sheet_count();
        stats.cells = graph.cell_count();
        stats.formula_cells = graph.formula_count();

        tracing::info!(
            sheets = stats.sheets,
            cells = stats.cells,
            formulas = stats.formula_cells,
            same_sheet_edges = stats.same_sheet_edges,
            cross_sheet_edges = stats.cross_sheet_edges,
            dangling = stats.dangling_references,
            "built dependency graph"
        );
        stats
    }

    fn load_sheet(graph: &mut Graph, sheet: &SheetSnapshot, stats: &mut BuildStats) {
        graph.put(SheetNode::new(&sheet.name));

        for cell in &sheet.cells {
            if let Err(e) = CellAddress::checked(cell.row, cell.column) {
                tracing::warn!(sheet = %sheet.name, row = cell.row, column = cell.column, error = %e, "skipping cell");
                stats.skipped_cells += 1;
                continue;
            }

            let node = CellNode::new(
                &sheet.name,
                cell.row,
                cell.column,
                cell.value.clone(),
                cell.formula.clone(),
            );
            let id = node.id().to_string();
            graph.put(node);
            graph.add_edge(&sheet.name, &id, EdgeKind::Contains);
        }

        tracing::debug!(sheet = %sheet.name, cells = sheet.cells.len(), "loaded sheet");
    }

    /// Phase 1: bare cell references inside one sheet
    fn link_same_sheet(graph: &mut Graph, sheet: &str, stats: &mut BuildStats) {
        let pending: Vec<(String, ResolvedReferences)> = {
            let resolver = ReferenceResolver::new(graph);
            graph
                .cells_in_sheet(sheet)
                .filter_map(|cell| {
                    let formula = cell.formula()?;
                    Some((cell.id().to_string(), resolver.resolve_unqualified(formula, sheet)))
                })
                .collect()
        };

        let added = Self::apply(graph, pending, stats);
        stats.same_sheet_edges += added;
    }

    /// Phase 2: sheet-qualified references across the whole document
    fn link_qualified(graph: &mut Graph, stats: &mut BuildStats) {
        let pending: Vec<(String, ResolvedReferences)> = {
            let resolver = ReferenceResolver::new(graph);
            graph
                .formula_cells()
                .filter_map(|cell| {
                    let formula = cell.formula()?;
                    Some((cell.id().to_string(), resolver.resolve_qualified(formula)))
                })
                .collect()
        };

        let added = Self::apply(graph, pending, stats);
        stats.cross_sheet_edges += added;
    }

    /// Add the resolved edges; returns how many were new
    fn apply(
        graph: &mut Graph,
        pending: Vec<(String, ResolvedReferences)>,
        stats: &mut BuildStats,
    ) -> usize {
        let before = graph.edge_count();

        for (source, resolved) in pending {
            for reference in &resolved.unresolved {
                tracing::warn!(cell = %source, reference = %reference, "formula reference resolves to no cell");
            }
            stats.dangling_references += resolved.unresolved.len();

            for target in &resolved.targets {
                graph.add_edge(&source, target, EdgeKind::DependsOn);
            }
        }

        graph.edge_count() - before
    }
}
