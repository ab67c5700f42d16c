//! Prelude module - common imports for cellgraph users
//!
//! ```rust
//! use cellgraph::prelude::*;
//! ```

pub use crate::{
    // Snapshot input
    CellSnapshot,
    // Commands
    Command,
    CommandDescriptor,
    CommandTranslator,
    // Sources
    CsvDirectorySource,
    DocumentSnapshot,
    // Errors
    Error,
    // Graph
    Graph,
    GraphService,
    GraphSummary,
    JsonFileSource,
    MemorySource,
    QueryOutcome,
    // Refresh
    RefreshOptions,
    Refresher,
    Result,
    RuleBasedTranslator,
    SheetSnapshot,
    SnapshotSource,
};
