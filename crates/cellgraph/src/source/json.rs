//! A document stored as one JSON file

use super::{apply_write, ensure_writable, SnapshotSource};
use crate::error::{SourceError, SourceResult};
use cellgraph_core::DocumentSnapshot;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Reads a serialized [`DocumentSnapshot`]; the document id is the file path
///
/// ```json
/// { "sheets": [ { "name": "Sheet1", "cells": [
///     { "row": 1, "column": 1, "value": "10" },
///     { "row": 1, "column": 2, "formula": "=A1*2" }
/// ] } ] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonFileSource {
    pretty: bool,
}

impl JsonFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-print the file when writing cells back
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn open(document_id: &str) -> SourceResult<File> {
        let path = Path::new(document_id);
        if !path.is_file() {
            return Err(SourceError::DocumentNotFound(document_id.to_string()));
        }
        Ok(File::open(path)?)
    }

    fn save(&self, document_id: &str, document: &DocumentSnapshot) -> SourceResult<()> {
        let mut writer = BufWriter::new(File::create(document_id)?);
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, document)?;
        } else {
            serde_json::to_writer(&mut writer, document)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl SnapshotSource for JsonFileSource {
    fn fetch_all_sheets(&self, document_id: &str) -> SourceResult<DocumentSnapshot> {
        let reader = BufReader::new(Self::open(document_id)?);
        let document: DocumentSnapshot = serde_json::from_reader(reader)?;
        tracing::debug!(
            path = document_id,
            sheets = document.sheets.len(),
            cells = document.cell_count(),
            "read JSON document"
        );
        Ok(document)
    }

    fn fetch_last_modified(&self, document_id: &str) -> SourceResult<DateTime<Utc>> {
        let file = Self::open(document_id)?;
        Ok(file.metadata()?.modified()?.into())
    }

    fn write_cell(&self, document_id: &str, sheet: &str, a1: &str, value: &str) -> SourceResult<()> {
        let mut document = self.fetch_all_sheets(document_id)?;
        ensure_writable(Path::new(document_id))?;
        apply_write(&mut document, sheet, a1, value)?;
        self.save(document_id, &document)?;
        tracing::info!(sheet, cell = a1, path = document_id, "wrote cell");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgraph_core::CellSnapshot;
    use pretty_assertions::assert_eq;

    const DOCUMENT: &str = r#"{ "sheets": [ { "name": "Sheet1", "cells": [
        { "row": 1, "column": 1, "value": "10" },
        { "row": 1, "column": 2, "formula": "=A1*2" }
    ] } ] }"#;

    #[test]
    fn test_read_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, DOCUMENT).unwrap();
        let id = path.to_str().unwrap();
        let source = JsonFileSource::new().pretty(true);

        let document = source.fetch_all_sheets(id).unwrap();
        assert_eq!(
            document.sheets[0].cells,
            vec![CellSnapshot::value(1, 1, "10"), CellSnapshot::formula(1, 2, "=A1*2")]
        );

        source.write_cell(id, "Sheet1", "A2", "=B1").unwrap();
        let document = source.fetch_all_sheets(id).unwrap();
        assert_eq!(document.sheets[0].cells[2], CellSnapshot::formula(2, 1, "=B1"));
    }

    #[test]
    fn test_missing_or_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let source = JsonFileSource::new();

        assert!(matches!(
            source.fetch_all_sheets(path.to_str().unwrap()),
            Err(SourceError::Json(_))
        ));
        assert!(matches!(
            source.fetch_all_sheets("/no/such/file.json"),
            Err(SourceError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_read_only_file_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.json");
        fs::write(&path, DOCUMENT).unwrap();
        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).unwrap();

        let result = JsonFileSource::new().write_cell(path.to_str().unwrap(), "Sheet1", "A1", "1");

        assert!(matches!(result, Err(SourceError::ReadOnly(_))));
    }
}
