//! Published graph snapshots
//!
//! A rebuild produces a complete [`GraphSnapshot`] off to the side and then
//! swaps it in. Readers hold an `Arc` to whichever snapshot was current when
//! they called [`SharedGraph::load`] and never observe a half-built graph.

use crate::builder::{BuildStats, GraphBuilder};
use arc_swap::ArcSwap;
use cellgraph_core::{CellRef, DocumentSnapshot, Graph};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Aggregate counts of one snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub cell_count: usize,
    pub sheet_count: usize,
    pub formula_count: usize,
    /// Edges of both kinds
    pub edge_count: usize,
}

impl fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Graph Summary: {} cells, {} sheets, {} formulas, {} edges",
            self.cell_count, self.sheet_count, self.formula_count, self.edge_count
        )
    }
}

/// An immutable, fully built graph plus the metadata of the load
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub document_id: String,
    pub graph: Graph,
    /// First sheet of the document; unqualified references resolve here
    pub active_sheet: Option<String>,
    /// Sheet names in document order
    pub sheet_order: Vec<String>,
    pub loaded_at: DateTime<Utc>,
    /// Source modification time observed before the fetch, if known
    pub source_modified: Option<DateTime<Utc>>,
    pub stats: BuildStats,
}

impl GraphSnapshot {
    /// A snapshot with no sheets, used before the first load
    pub fn empty(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            graph: Graph::new(),
            active_sheet: None,
            sheet_order: Vec::new(),
            loaded_at: Utc::now(),
            source_modified: None,
            stats: BuildStats::default(),
        }
    }

    /// Build a snapshot from fetched document contents
    pub fn from_document(
        document_id: impl Into<String>,
        document: &DocumentSnapshot,
        source_modified: Option<DateTime<Utc>>,
    ) -> Self {
        let (graph, stats) = GraphBuilder::build(document);
        Self {
            document_id: document_id.into(),
            graph,
            active_sheet: document.active_sheet().map(str::to_string),
            sheet_order: document.sheets.iter().map(|s| s.name.clone()).collect(),
            loaded_at: Utc::now(),
            source_modified,
            stats,
        }
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            cell_count: self.graph.cell_count(),
            sheet_count: self.graph.sheet_count(),
            formula_count: self.graph.formula_count(),
            edge_count: self.graph.edge_count(),
        }
    }

    /// Turn a user-facing reference (`A1`, `Sheet2!b$3`) into a cell id
    ///
    /// Unqualified references use the active sheet. Returns `None` when the
    /// text is not a cell reference or there is no sheet to default to; the
    /// id is returned even when no such cell exists.
    pub fn resolve_cell_id(&self, reference: &str) -> Option<String> {
        let cell_ref = CellRef::parse(reference).ok()?;
        match (&cell_ref.sheet, &self.active_sheet) {
            (Some(_), _) => Some(cell_ref.cell_id("")),
            (None, Some(active)) => Some(cell_ref.cell_id(active)),
            (None, None) => None,
        }
    }

    /// Look up a loaded sheet name ignoring case
    pub fn find_sheet(&self, name: &str) -> Option<&str> {
        self.sheet_order
            .iter()
            .find(|s| s.eq_ignore_ascii_case(name.trim()))
            .map(String::as_str)
    }
}

/// Atomically swappable handle to the current [`GraphSnapshot`]
///
/// Cloning is cheap; all clones observe the same publications.
#[derive(Clone)]
pub struct SharedGraph {
    current: Arc<ArcSwap<GraphSnapshot>>,
}

impl SharedGraph {
    pub fn new(initial: GraphSnapshot) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// The snapshot current at the time of the call
    pub fn load(&self) -> Arc<GraphSnapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot, returning the previous one
    pub fn publish(&self, snapshot: GraphSnapshot) -> Arc<GraphSnapshot> {
        self.current.swap(Arc::new(snapshot))
    }
}

impl fmt::Debug for SharedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.load();
        f.debug_struct("SharedGraph")
            .field("document_id", &current.document_id)
            .field("summary", &current.summary())
            .finish()
    }
}
