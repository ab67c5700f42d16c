//! Error types

use thiserror::Error;

/// Result type for snapshot source operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Errors raised while reading from or writing to a snapshot source
#[derive(Debug, Error)]
pub enum SourceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV library error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document id does not name a document
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Sheet does not exist in the document
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Malformed cell reference passed to a write
    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    /// The source does not accept writes
    #[error("Source is read-only: {0}")]
    ReadOnly(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] cellgraph_core::Error),
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`GraphService`](crate::GraphService) and the refresher
#[derive(Debug, Error)]
pub enum Error {
    /// Snapshot fetch or write failed
    #[error("Snapshot source error: {0}")]
    Source(#[from] SourceError),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] cellgraph_core::Error),

    /// Background refresh could not be started or stopped cleanly
    #[error("Refresh error: {0}")]
    Refresh(String),
}
