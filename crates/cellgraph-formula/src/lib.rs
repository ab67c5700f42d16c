//! # cellgraph-formula
//!
//! Formula reference handling for cellgraph.
//!
//! This crate provides:
//! - [`ReferenceLexer`] - extracts reference tokens from formula text
//! - [`ReferenceResolver`] - maps those tokens onto cells of a [`Graph`](cellgraph_core::Graph)
//!
//! Formulas are never evaluated; only the references they contain matter.
//!
//! ## Example
//!
//! ```rust
//! use cellgraph_core::{CellNode, EdgeKind, Graph, SheetNode};
//! use cellgraph_formula::ReferenceResolver;
//!
//! let mut graph = Graph::new();
//! graph.put(SheetNode::new("Sheet1"));
//! graph.put(CellNode::new("Sheet1", 1, 1, "10", None));
//! graph.add_edge("Sheet1", "Sheet1!A1", EdgeKind::Contains);
//!
//! let resolved = ReferenceResolver::new(&graph).resolve_unqualified("=A1*2", "Sheet1");
//! assert!(resolved.targets.contains("Sheet1!A1"));
//! ```

pub mod lexer;
pub mod resolver;

pub use lexer::{scan_references, Reference, ReferenceLexer};
pub use resolver::{ReferenceResolver, ResolvedReferences};
