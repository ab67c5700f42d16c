//! # cellgraph-core
//!
//! Core data structures for the cellgraph dependency engine.
//!
//! This crate provides:
//! - [`CellAddress`] and [`CellRef`] - A1 addressing
//! - [`Node`], [`SheetNode`], [`CellNode`] - graph nodes
//! - [`Graph`] - node store and typed, bidirectional edge index
//! - transitive dependency / dependent search on [`Graph`]
//! - [`DocumentSnapshot`] - raw sheet contents a graph is built from
//!
//! ## Example
//!
//! ```rust
//! use cellgraph_core::{CellNode, EdgeKind, Graph, SheetNode};
//!
//! let mut graph = Graph::new();
//! graph.put(SheetNode::new("Sheet1"));
//! graph.put(CellNode::new("Sheet1", 1, 1, "10", None));
//! graph.put(CellNode::new("Sheet1", 1, 2, "", Some("=A1*2".into())));
//! graph.add_edge("Sheet1!B1", "Sheet1!A1", EdgeKind::DependsOn);
//!
//! assert!(graph.transitive_dependents("Sheet1!A1").contains("Sheet1!B1"));
//! ```

pub mod address;
pub mod error;
pub mod graph;
pub mod node;
pub mod snapshot;
pub mod traversal;

pub use address::{cell_id, column_part, CellAddress, CellRef};
pub use error::{Error, Result};
pub use graph::{EdgeKind, Graph, NodeIx};
pub use node::{CellNode, Node, NodeKind, SheetNode};
pub use snapshot::{CellSnapshot, DocumentSnapshot, SheetSnapshot};
pub use traversal::Direction;

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet (XFD)
pub const MAX_COLS: u32 = 16_384;
