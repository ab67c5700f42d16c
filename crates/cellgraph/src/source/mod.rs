//! Snapshot sources
//!
//! A source hands out complete point-in-time copies of a document's cells.
//! It is pull-based: callers ask for the modification time to decide whether
//! a fresh fetch is worthwhile.

mod csv_dir;
mod json;
mod memory;

pub use csv_dir::{CsvDirectorySource, CsvSourceOptions};
pub use json::JsonFileSource;
pub use memory::MemorySource;

use crate::error::{SourceError, SourceResult};
use cellgraph_core::{CellAddress, CellSnapshot, DocumentSnapshot};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Read and write access to documents made of named sheets
pub trait SnapshotSource: Send + Sync {
    /// Every sheet of the document, in document order
    fn fetch_all_sheets(&self, document_id: &str) -> SourceResult<DocumentSnapshot>;

    /// When the document last changed
    fn fetch_last_modified(&self, document_id: &str) -> SourceResult<DateTime<Utc>>;

    /// Set one cell; text starting with `=` is stored as a formula
    fn write_cell(
        &self,
        document_id: &str,
        sheet: &str,
        a1: &str,
        value: &str,
    ) -> SourceResult<()>;
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Arc<S> {
    fn fetch_all_sheets(&self, document_id: &str) -> SourceResult<DocumentSnapshot> {
        (**self).fetch_all_sheets(document_id)
    }

    fn fetch_last_modified(&self, document_id: &str) -> SourceResult<DateTime<Utc>> {
        (**self).fetch_last_modified(document_id)
    }

    fn write_cell(&self, document_id: &str, sheet: &str, a1: &str, value: &str) -> SourceResult<()> {
        (**self).write_cell(document_id, sheet, a1, value)
    }
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    fn fetch_all_sheets(&self, document_id: &str) -> SourceResult<DocumentSnapshot> {
        (**self).fetch_all_sheets(document_id)
    }

    fn fetch_last_modified(&self, document_id: &str) -> SourceResult<DateTime<Utc>> {
        (**self).fetch_last_modified(document_id)
    }

    fn write_cell(&self, document_id: &str, sheet: &str, a1: &str, value: &str) -> SourceResult<()> {
        (**self).write_cell(document_id, sheet, a1, value)
    }
}

/// Refuse writes to files marked read-only
pub(crate) fn ensure_writable(path: &Path) -> SourceResult<()> {
    if fs::metadata(path)?.permissions().readonly() {
        return Err(SourceError::ReadOnly(path.display().to_string()));
    }
    Ok(())
}

/// Apply a cell write to an in-memory document
pub(crate) fn apply_write(
    document: &mut DocumentSnapshot,
    sheet: &str,
    a1: &str,
    value: &str,
) -> SourceResult<()> {
    let address =
        CellAddress::parse(a1).map_err(|_| SourceError::InvalidCellRef(a1.to_string()))?;
    let target = document
        .sheet_mut(sheet)
        .ok_or_else(|| SourceError::SheetNotFound(sheet.to_string()))?;

    let replacement = cell_from_input(address, value);
    match target
        .cells
        .iter_mut()
        .find(|c| c.row == address.row && c.column == address.column)
    {
        Some(cell) => *cell = replacement,
        None => target.cells.push(replacement),
    }
    Ok(())
}

fn cell_from_input(address: CellAddress, value: &str) -> CellSnapshot {
    if value.starts_with('=') {
        CellSnapshot::formula(address.row, address.column, value)
    } else {
        CellSnapshot::value(address.row, address.column, value)
    }
}
