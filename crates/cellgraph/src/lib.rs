//! # cellgraph
//!
//! Dependency analysis for multi-sheet spreadsheets.
//!
//! cellgraph loads every cell of a document from a [`SnapshotSource`],
//! builds a graph of which cells reference which, and answers two questions
//! about any cell: what it depends on, and what is affected when it changes.
//!
//! ## Features
//!
//! - Same-sheet, cross-sheet and whole-column references
//! - Cycle-safe transitive dependency and impact queries
//! - CSV directory, JSON file and in-memory sources
//! - Atomic publication of rebuilt graphs and optional background refresh
//! - Structured commands with a keyword-based question translator
//!
//! ## Example
//!
//! ```rust
//! use cellgraph::prelude::*;
//!
//! let source = MemorySource::new().with_document(
//!     "plan",
//!     DocumentSnapshot::new(vec![
//!         SheetSnapshot::new("Employees", vec![CellSnapshot::value(1, 1, "Ada")]),
//!         SheetSnapshot::new("Sales", vec![CellSnapshot::formula(2, 5, "=COUNTA(Employees!A:A)")]),
//!     ]),
//! );
//!
//! let service = GraphService::open(source, "plan")?;
//! assert!(service.dependents_of("Employees!A1").contains("Sales!E2"));
//!
//! let (_, outcome) = service.ask(&RuleBasedTranslator, "what does Sales!E2 depend on?");
//! assert!(outcome.success);
//! # Ok::<(), cellgraph::Error>(())
//! ```

pub mod builder;
pub mod command;
pub mod error;
pub mod prelude;
pub mod query;
pub mod refresh;
pub mod shared;
pub mod source;
pub mod translate;

pub use builder::{BuildStats, GraphBuilder};
pub use command::{Command, CommandDescriptor, QueryData, QueryOutcome, UnknownCommand};
pub use error::{Error, Result, SourceError, SourceResult};
pub use query::{FindOptions, GraphService};
pub use refresh::{refresh_once, RefreshHandle, RefreshOptions, RefreshOutcome, Refresher};
pub use shared::{GraphSnapshot, GraphSummary, SharedGraph};
pub use source::{CsvDirectorySource, CsvSourceOptions, JsonFileSource, MemorySource, SnapshotSource};
pub use translate::{CommandTranslator, RuleBasedTranslator};

// Re-export core types
pub use cellgraph_core::{
    cell_id, CellAddress, CellNode, CellRef, CellSnapshot, Direction, DocumentSnapshot, EdgeKind,
    Graph, Node, NodeKind, SheetNode, SheetSnapshot,
};
pub use cellgraph_formula::{scan_references, Reference, ReferenceResolver};
