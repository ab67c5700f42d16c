//! In-process document store

use super::{apply_write, SnapshotSource};
use crate::error::{SourceError, SourceResult};
use cellgraph_core::DocumentSnapshot;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug)]
struct StoredDocument {
    contents: DocumentSnapshot,
    modified: DateTime<Utc>,
}

/// Documents held in memory, keyed by id
///
/// Every write moves the modification time strictly forward, even when two
/// writes land within the clock's resolution.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: RwLock<HashMap<String, StoredDocument>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_document(self, document_id: impl Into<String>, contents: DocumentSnapshot) -> Self {
        self.insert(document_id, contents);
        self
    }

    /// Add or replace a whole document
    pub fn insert(&self, document_id: impl Into<String>, contents: DocumentSnapshot) {
        let mut documents = self.documents.write();
        let document_id = document_id.into();
        let modified = next_modified(documents.get(&document_id).map(|d| d.modified));
        documents.insert(document_id, StoredDocument { contents, modified });
    }

    pub fn remove(&self, document_id: &str) -> Option<DocumentSnapshot> {
        self.documents.write().remove(document_id).map(|d| d.contents)
    }
}

impl SnapshotSource for MemorySource {
    fn fetch_all_sheets(&self, document_id: &str) -> SourceResult<DocumentSnapshot> {
        self.documents
            .read()
            .get(document_id)
            .map(|d| d.contents.clone())
            .ok_or_else(|| SourceError::DocumentNotFound(document_id.to_string()))
    }

    fn fetch_last_modified(&self, document_id: &str) -> SourceResult<DateTime<Utc>> {
        self.documents
            .read()
            .get(document_id)
            .map(|d| d.modified)
            .ok_or_else(|| SourceError::DocumentNotFound(document_id.to_string()))
    }

    fn write_cell(&self, document_id: &str, sheet: &str, a1: &str, value: &str) -> SourceResult<()> {
        let mut documents = self.documents.write();
        let document = documents
            .get_mut(document_id)
            .ok_or_else(|| SourceError::DocumentNotFound(document_id.to_string()))?;

        apply_write(&mut document.contents, sheet, a1, value)?;
        document.modified = next_modified(Some(document.modified));
        Ok(())
    }
}

fn next_modified(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(previous) if now <= previous => previous + Duration::milliseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgraph_core::{CellSnapshot, SheetSnapshot};

    fn source() -> MemorySource {
        MemorySource::new().with_document(
            "doc",
            DocumentSnapshot::new(vec![SheetSnapshot::new(
                "Sheet1",
                vec![CellSnapshot::value(1, 1, "1")],
            )]),
        )
    }

    #[test]
    fn test_fetch() {
        let source = source();

        assert_eq!(source.fetch_all_sheets("doc").unwrap().cell_count(), 1);
        assert!(matches!(
            source.fetch_all_sheets("other"),
            Err(SourceError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_write_advances_modified_time() {
        let source = source();
        let before = source.fetch_last_modified("doc").unwrap();

        source.write_cell("doc", "Sheet1", "A2", "=A1").unwrap();
        let after = source.fetch_last_modified("doc").unwrap();

        assert!(after > before);
        let document = source.fetch_all_sheets("doc").unwrap();
        assert_eq!(document.sheets[0].cells.len(), 2);
        assert!(document.sheets[0].cells[1].has_formula());
    }

    #[test]
    fn test_failed_write_leaves_document_untouched() {
        let source = source();
        let before = source.fetch_last_modified("doc").unwrap();

        assert!(source.write_cell("doc", "Missing", "A1", "x").is_err());
        assert_eq!(source.fetch_last_modified("doc").unwrap(), before);
    }
}
