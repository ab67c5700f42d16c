//! Error types for cellgraph-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cellgraph-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid `[sheet!]A1` cell reference
    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    /// Row number out of bounds (rows are 1-based)
    #[error("Row {0} out of bounds (expected 1..={1})")]
    RowOutOfBounds(u32, u32),

    /// Column number out of bounds (columns are 1-based)
    #[error("Column {0} out of bounds (expected 1..={1})")]
    ColumnOutOfBounds(u32, u32),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0:?}")]
    InvalidSheetName(String),
}
