//! A directory of CSV files read as one document

use super::{ensure_writable, SnapshotSource};
use crate::error::{SourceError, SourceResult};
use cellgraph_core::{CellAddress, CellSnapshot, DocumentSnapshot, SheetSnapshot};
use chrono::{DateTime, Utc};
use csv::StringRecord;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Options for reading CSV sheets
#[derive(Debug, Clone)]
pub struct CsvSourceOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Leading character that marks a field as a formula (default: `=`)
    pub formula_prefix: char,
}

impl Default for CsvSourceOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            formula_prefix: '=',
        }
    }
}

/// Treats a directory as a document and each `*.csv` file in it as a sheet
///
/// The document id is the directory path. Sheets are named after the file
/// stem and ordered by file name, so the alphabetically first file is the
/// active sheet. Rows have no header; row 1 is the first line.
#[derive(Debug, Clone, Default)]
pub struct CsvDirectorySource {
    options: CsvSourceOptions,
}

impl CsvDirectorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CsvSourceOptions) -> Self {
        Self { options }
    }

    /// `(sheet name, path)` of every CSV file, sorted by file name
    fn sheet_files(&self, document_id: &str) -> SourceResult<Vec<(String, PathBuf)>> {
        let dir = Path::new(document_id);
        if !dir.is_dir() {
            return Err(SourceError::DocumentNotFound(document_id.to_string()));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((stem.to_string(), path.clone()));
            }
        }

        files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
        Ok(files)
    }

    fn read_sheet(&self, name: &str, path: &Path) -> SourceResult<SheetSnapshot> {
        let mut cells = Vec::new();

        for (row, record) in self.rows(path)? {
            for (col_idx, field) in record.iter().enumerate() {
                if field.trim().is_empty() {
                    continue;
                }
                let column = col_idx as u32 + 1;
                let cell = if self.is_formula(field) {
                    CellSnapshot::formula(row, column, field)
                } else {
                    CellSnapshot::value(row, column, field)
                };
                cells.push(cell);
            }
        }

        tracing::debug!(sheet = name, path = %path.display(), cells = cells.len(), "read CSV sheet");
        Ok(SheetSnapshot::new(name, cells))
    }

    /// Records with their 1-based sheet row
    ///
    /// The csv reader skips blank lines; each one still counts as an empty
    /// row. Line breaks inside quoted fields do not start a new row.
    fn rows(&self, path: &Path) -> SourceResult<Vec<(u32, StringRecord)>> {
        let mut rows = Vec::new();
        let mut row = 0u32;
        let mut next_line = 1u64;

        for record in self.reader(File::open(path)?).records() {
            let record = record?;
            let line = record.position().map_or(next_line, |p| p.line());
            let blank_lines = line.saturating_sub(next_line);
            row = row.saturating_add(1).saturating_add(blank_lines.min(u32::MAX as u64) as u32);

            let embedded_breaks: u64 = record.iter().map(|f| f.matches('\n').count() as u64).sum();
            next_line = line + 1 + embedded_breaks;
            rows.push((row, record));
        }
        Ok(rows)
    }

    /// File contents as a grid; blank lines are empty rows
    fn read_grid(&self, path: &Path) -> SourceResult<Vec<Vec<String>>> {
        let mut grid: Vec<Vec<String>> = Vec::new();
        for (row, record) in self.rows(path)? {
            grid.resize(row as usize - 1, Vec::new());
            grid.push(record.iter().map(str::to_string).collect());
        }
        Ok(grid)
    }

    fn write_grid(&self, path: &Path, grid: &[Vec<String>]) -> SourceResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.options.delimiter)
            .flexible(true)
            .from_path(path)?;
        for row in grid {
            if row.iter().all(String::is_empty) {
                // a bare line break; an empty record would be written as ""
                writer.flush()?;
                (&mut writer.get_ref()).write_all(b"\n")?;
            } else {
                writer.write_record(row)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn reader(&self, file: File) -> csv::Reader<File> {
        csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(file)
    }

    fn is_formula(&self, field: &str) -> bool {
        field.starts_with(self.options.formula_prefix) && field.len() > self.options.formula_prefix.len_utf8()
    }
}

impl SnapshotSource for CsvDirectorySource {
    fn fetch_all_sheets(&self, document_id: &str) -> SourceResult<DocumentSnapshot> {
        self.sheet_files(document_id)?
            .iter()
            .map(|(name, path)| self.read_sheet(name, path))
            .collect::<SourceResult<Vec<_>>>()
            .map(DocumentSnapshot::new)
    }

    fn fetch_last_modified(&self, document_id: &str) -> SourceResult<DateTime<Utc>> {
        // the directory's own mtime changes when files are added or removed
        let mut latest: DateTime<Utc> = fs::metadata(document_id)?.modified()?.into();
        for (_, path) in self.sheet_files(document_id)? {
            let modified: DateTime<Utc> = fs::metadata(&path)?.modified()?.into();
            latest = latest.max(modified);
        }
        Ok(latest)
    }

    fn write_cell(&self, document_id: &str, sheet: &str, a1: &str, value: &str) -> SourceResult<()> {
        let address =
            CellAddress::parse(a1).map_err(|_| SourceError::InvalidCellRef(a1.to_string()))?;
        let (_, path) = self
            .sheet_files(document_id)?
            .into_iter()
            .find(|(name, _)| name == sheet)
            .ok_or_else(|| SourceError::SheetNotFound(sheet.to_string()))?;
        ensure_writable(&path)?;

        let mut grid = self.read_grid(&path)?;
        let (row, col) = (address.row as usize - 1, address.column as usize - 1);
        if grid.len() <= row {
            grid.resize(row + 1, Vec::new());
        }
        if grid[row].len() <= col {
            grid[row].resize(col + 1, String::new());
        }
        grid[row][col] = value.to_string();

        self.write_grid(&path, &grid)?;
        tracing::info!(sheet, cell = %address, path = %path.display(), "wrote cell");
        Ok(())
    }
}
