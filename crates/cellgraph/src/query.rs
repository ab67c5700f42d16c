//! Query layer
//!
//! [`GraphService`] ties a [`SnapshotSource`] to a [`SharedGraph`]. Every
//! read works on the snapshot that was current when the call started, so
//! queries never block on (or observe) a rebuild in progress.
//!
//! # Example
//!
//! ```rust
//! use cellgraph::prelude::*;
//!
//! let source = MemorySource::new().with_document(
//!     "budget",
//!     DocumentSnapshot::new(vec![SheetSnapshot::new(
//!         "Sheet1",
//!         vec![
//!             CellSnapshot::value(1, 1, "10"),
//!             CellSnapshot::formula(1, 2, "=A1*2"),
//!             CellSnapshot::formula(1, 3, "=B1+1"),
//!         ],
//!     )]),
//! );
//!
//! let service = GraphService::open(source, "budget")?;
//! let affected = service.dependents_of("A1");
//! assert_eq!(affected.len(), 2);
//! # Ok::<(), cellgraph::Error>(())
//! ```

use crate::command::{Command, CommandDescriptor, QueryData, QueryOutcome};
use crate::error::{Result, SourceError};
use crate::shared::{GraphSnapshot, GraphSummary, SharedGraph};
use crate::source::SnapshotSource;
use cellgraph_core::{CellNode, CellRef};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

/// Result caps for [`GraphService::find_cells`]
#[derive(Debug, Clone)]
pub struct FindOptions {
    /// Cells listed for a sheet-specific search (default: 20)
    pub sheet_limit: usize,
    /// Cells returned by a keyword search (default: 10)
    pub sample_limit: usize,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            sheet_limit: 20,
            sample_limit: 10,
        }
    }
}

/// Dependency queries over one document
pub struct GraphService<S> {
    source: S,
    document_id: String,
    shared: SharedGraph,
    find_options: FindOptions,
    /// Held from fetch to publish so a slower, older load never replaces a
    /// newer graph
    reload_lock: Mutex<()>,
}

impl<S: SnapshotSource> GraphService<S> {
    /// Create a service with an empty graph; call [`reload`](Self::reload)
    /// to populate it
    pub fn new(source: S, document_id: impl Into<String>) -> Self {
        let document_id = document_id.into();
        Self {
            shared: SharedGraph::new(GraphSnapshot::empty(document_id.clone())),
            source,
            document_id,
            find_options: FindOptions::default(),
            reload_lock: Mutex::new(()),
        }
    }

    /// Create a service and load the document once
    pub fn open(source: S, document_id: impl Into<String>) -> Result<Self> {
        let service = Self::new(source, document_id);
        service.reload()?;
        Ok(service)
    }

    pub fn with_find_options(mut self, options: FindOptions) -> Self {
        self.find_options = options;
        self
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Handle to the published graph; clones observe every reload
    pub fn shared(&self) -> &SharedGraph {
        &self.shared
    }

    /// The currently published snapshot
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.shared.load()
    }

    /// Fetch every sheet, rebuild the graph and publish it
    ///
    /// On a fetch failure the previous graph stays published. Concurrent
    /// reloads run one at a time, so the last one to finish saw the newest
    /// document.
    pub fn reload(&self) -> Result<GraphSummary> {
        let _guard = self.reload_lock.lock();

        let modified = match self.source.fetch_last_modified(&self.document_id) {
            Ok(modified) => Some(modified),
            Err(e) => {
                tracing::warn!(document = %self.document_id, error = %e, "could not read modification time");
                None
            }
        };

        let document = self.source.fetch_all_sheets(&self.document_id)?;
        let snapshot = GraphSnapshot::from_document(self.document_id.clone(), &document, modified);
        let summary = snapshot.summary();
        self.shared.publish(snapshot);

        tracing::info!(document = %self.document_id, %summary, "published graph");
        Ok(summary)
    }

    /// Modification time reported by the source right now
    pub fn last_modified(&self) -> Result<DateTime<Utc>> {
        Ok(self.source.fetch_last_modified(&self.document_id)?)
    }

    /// Every cell `cell_ref` reads, directly or transitively
    ///
    /// The queried cell is never part of the result, even on a cycle.
    /// Unknown or malformed references give an empty set.
    pub fn dependencies_of(&self, cell_ref: &str) -> BTreeSet<String> {
        self.closure(cell_ref, |snapshot, id| snapshot.graph.transitive_dependencies(id))
    }

    /// Every cell affected by a change to `cell_ref`
    pub fn dependents_of(&self, cell_ref: &str) -> BTreeSet<String> {
        self.closure(cell_ref, |snapshot, id| snapshot.graph.transitive_dependents(id))
    }

    /// Whether `cell_ref` takes part in a reference cycle
    pub fn is_circular(&self, cell_ref: &str) -> bool {
        let snapshot = self.snapshot();
        snapshot
            .resolve_cell_id(cell_ref)
            .map_or(false, |id| snapshot.graph.is_circular(&id))
    }

    /// Cells with a formula, in document order
    pub fn formula_cells(&self) -> Vec<CellNode> {
        self.snapshot().graph.formula_cells().cloned().collect()
    }

    /// Sheet names in document order
    pub fn sheet_names(&self) -> Vec<String> {
        self.snapshot().sheet_order.clone()
    }

    pub fn summary(&self) -> GraphSummary {
        self.snapshot().summary()
    }

    /// Write a cell through the source, then reload the whole graph
    pub fn update_cell(&self, cell_ref: &str, new_value: &str) -> Result<GraphSummary> {
        let parsed = CellRef::parse(cell_ref)?;
        let sheet = match parsed.sheet {
            Some(sheet) => sheet,
            None => self
                .snapshot()
                .active_sheet
                .clone()
                .ok_or_else(|| SourceError::SheetNotFound(cell_ref.to_string()))?,
        };
        let a1 = parsed.address.to_a1_string();

        self.source
            .write_cell(&self.document_id, &sheet, &a1, new_value)?;
        tracing::info!(%sheet, cell = %a1, value = new_value, "updated cell");

        self.reload()
    }

    /// List cells of one sheet, or search all cells by keyword
    ///
    /// With a sheet name the first cells of that sheet (row-major) are listed.
    /// Otherwise `criteria` selects date-like values (`july`, `date`),
    /// financial values (`financial`, `revenue`, `money`), formulas, or a
    /// plain sample.
    pub fn find_cells(&self, sheet_name: Option<&str>, criteria: &str) -> QueryOutcome {
        let snapshot = self.snapshot();

        if let Some(sheet_name) = sheet_name.map(str::trim).filter(|s| !s.is_empty()) {
            return self.list_sheet_cells(&snapshot, sheet_name);
        }

        let criteria = criteria.to_lowercase();
        let limit = self.find_options.sample_limit;

        if criteria.contains("july") || criteria.contains("date") {
            let cells = matching_values(&snapshot, &["july", "date", "2024"], limit);
            QueryOutcome::ok(
                format!("Found {} cells containing date-related data", cells.len()),
                Some(QueryData::Cells(cells)),
            )
        } else if ["financial", "revenue", "money"]
            .iter()
            .any(|w| criteria.contains(w))
        {
            let cells = matching_values(&snapshot, &["revenue", "$", "price"], limit);
            QueryOutcome::ok(
                format!("Found {} cells containing financial data", cells.len()),
                Some(QueryData::Cells(cells)),
            )
        } else if criteria.contains("formula") {
            self.list_formulas()
        } else {
            let cells: Vec<CellNode> = snapshot.graph.cells().take(limit).cloned().collect();
            QueryOutcome::ok(
                format!(
                    "Found {} sample cells across all sheets (use more specific search terms)",
                    cells.len()
                ),
                Some(QueryData::Cells(cells)),
            )
        }
    }

    /// Answer a structured command
    pub fn execute(&self, descriptor: &CommandDescriptor) -> QueryOutcome {
        let Some(name) = descriptor.command.as_deref() else {
            return QueryOutcome::failure("Invalid query: missing 'command' field");
        };
        if name.trim().is_empty() {
            return QueryOutcome::failure("Invalid query: empty 'command' field");
        }

        let command = match name.parse::<Command>() {
            Ok(command) => command,
            Err(e) => return QueryOutcome::failure(e.to_string()),
        };
        tracing::debug!(%command, cell = ?descriptor.target_cell, "executing command");

        match command {
            Command::ImpactAnalysis => self.impact_analysis(descriptor),
            Command::DependencyAnalysis => self.dependency_analysis(descriptor),
            Command::ListFormulas => self.list_formulas(),
            Command::ListSheets => self.list_sheets(),
            Command::FindCells => {
                let criteria = descriptor
                    .criteria
                    .as_deref()
                    .or(descriptor.description.as_deref())
                    .unwrap_or_default();
                self.find_cells(descriptor.sheet_name.as_deref(), criteria)
            }
            Command::UpdateCell => self.execute_update(descriptor),
            Command::Error => QueryOutcome::failure(
                descriptor
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
        }
    }

    /// Parse a JSON descriptor and execute it
    pub fn execute_json(&self, json: &str) -> QueryOutcome {
        match CommandDescriptor::from_json(json) {
            Ok(descriptor) => self.execute(&descriptor),
            Err(e) => QueryOutcome::failure(format!("Error executing query: {e}")),
        }
    }

    // === Command handlers ===

    fn impact_analysis(&self, descriptor: &CommandDescriptor) -> QueryOutcome {
        let target = match required_target(descriptor, "Impact analysis requires a target cell") {
            Ok(target) => target,
            Err(failure) => return failure,
        };

        let affected = self.dependents_of(target);
        let mut message = format!("Impact analysis for {target}: {} cells affected\n", affected.len());
        if affected.is_empty() {
            let _ = write!(message, "No cells are affected by changes to {target}");
        } else {
            message.push_str("Cells affected:\n");
            push_id_lines(&mut message, &affected);
        }

        QueryOutcome::ok(message, Some(QueryData::CellIds(affected.into_iter().collect())))
    }

    fn dependency_analysis(&self, descriptor: &CommandDescriptor) -> QueryOutcome {
        let target = match required_target(descriptor, "Dependency analysis requires a target cell") {
            Ok(target) => target,
            Err(failure) => return failure,
        };

        let dependencies = self.dependencies_of(target);
        let mut message = format!(
            "Dependency analysis for {target}: {} dependencies\n",
            dependencies.len()
        );
        if dependencies.is_empty() {
            let _ = write!(message, "No dependencies found for {target}");
        } else {
            message.push_str("Dependencies:\n");
            push_id_lines(&mut message, &dependencies);
        }

        QueryOutcome::ok(message, Some(QueryData::CellIds(dependencies.into_iter().collect())))
    }

    fn list_formulas(&self) -> QueryOutcome {
        let cells = self.formula_cells();

        let mut message = format!("Found {} cells with formulas:\n", cells.len());
        for (i, cell) in cells.iter().enumerate() {
            let _ = writeln!(message, "{}. {}: {}", i + 1, cell.id(), cell.formula().unwrap_or_default());
        }

        QueryOutcome::ok(message, Some(QueryData::Cells(cells)))
    }

    fn list_sheets(&self) -> QueryOutcome {
        let sheets = self.sheet_names();

        let mut message = String::from("Sheets in this spreadsheet:\n");
        for (i, sheet) in sheets.iter().enumerate() {
            let _ = writeln!(message, "{}. {}", i + 1, sheet);
        }

        QueryOutcome::ok(message, Some(QueryData::Sheets(sheets)))
    }

    fn list_sheet_cells(&self, snapshot: &GraphSnapshot, sheet_name: &str) -> QueryOutcome {
        let mut cells: Vec<&CellNode> = snapshot
            .find_sheet(sheet_name)
            .map(|sheet| snapshot.graph.cells_in_sheet(sheet).collect())
            .unwrap_or_default();
        cells.sort_by_key(|c| (c.row(), c.column()));

        let limit = self.find_options.sheet_limit;
        let mut message = format!("Cells in sheet '{sheet_name}':\n");
        for (i, cell) in cells.iter().take(limit).enumerate() {
            let _ = writeln!(message, "{}. {}: {}", i + 1, cell.a1_notation(), display_text(cell));
        }
        if cells.len() > limit {
            let _ = write!(message, "... and {} more cells", cells.len() - limit);
        }

        let shown = cells.into_iter().take(limit).cloned().collect();
        QueryOutcome::ok(message, Some(QueryData::Cells(shown)))
    }

    fn execute_update(&self, descriptor: &CommandDescriptor) -> QueryOutcome {
        let Some(target) = descriptor.target_cell.as_deref() else {
            return QueryOutcome::failure("Update cell requires a target cell");
        };
        let Some(value) = descriptor.new_value.as_deref() else {
            return QueryOutcome::failure("Update cell requires a new value");
        };
        if target.trim().is_empty() {
            return QueryOutcome::failure("Target cell cannot be empty");
        }

        match self.update_cell(target, value) {
            Ok(_) => QueryOutcome::ok(format!("Cell {target} updated to {value}"), None),
            Err(e) => {
                tracing::warn!(cell = target, error = %e, "cell update failed");
                QueryOutcome::failure(format!("Failed to update cell {target}: {e}"))
            }
        }
    }

    fn closure<F>(&self, cell_ref: &str, walk: F) -> BTreeSet<String>
    where
        F: for<'a> Fn(&'a GraphSnapshot, &str) -> BTreeSet<&'a str>,
    {
        let snapshot = self.snapshot();
        let Some(id) = snapshot.resolve_cell_id(cell_ref) else {
            return BTreeSet::new();
        };

        walk(&*snapshot, id.as_str())
            .into_iter()
            .filter(|found| *found != id)
            .map(str::to_string)
            .collect()
    }
}

fn required_target<'d>(
    descriptor: &'d CommandDescriptor,
    missing: &str,
) -> std::result::Result<&'d str, QueryOutcome> {
    match descriptor.target_cell.as_deref() {
        None => Err(QueryOutcome::failure(missing)),
        Some(target) if target.trim().is_empty() => {
            Err(QueryOutcome::failure("Target cell cannot be empty"))
        }
        Some(target) => Ok(target.trim()),
    }
}

fn push_id_lines(message: &mut String, ids: &BTreeSet<String>) {
    for id in ids {
        let _ = writeln!(message, "  {id}");
    }
}

/// Value text, falling back to the formula, then `(empty)`
fn display_text(cell: &CellNode) -> &str {
    match (cell.value(), cell.formula()) {
        (value, _) if !value.is_empty() => value,
        (_, Some(formula)) => formula,
        _ => "(empty)",
    }
}

fn matching_values(snapshot: &GraphSnapshot, needles: &[&str], limit: usize) -> Vec<CellNode> {
    snapshot
        .graph
        .cells()
        .filter(|cell| {
            let value = cell.value().to_lowercase();
            needles.iter().any(|n| value.contains(n))
        })
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::error::SourceResult;
    use cellgraph_core::{CellSnapshot, DocumentSnapshot, SheetSnapshot};
    use crossbeam_channel::{bounded, Receiver, Sender};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn service() -> GraphService<MemorySource> {
        let document = DocumentSnapshot::new(vec![
            SheetSnapshot::new(
                "Sheet1",
                vec![
                    CellSnapshot::value(1, 1, "10"),
                    CellSnapshot::formula(1, 2, "=A1*2"),
                    CellSnapshot::formula(1, 3, "=B1+Deals!A1"),
                ],
            ),
            SheetSnapshot::new(
                "Deals",
                vec![
                    CellSnapshot::value(1, 1, "Revenue $500"),
                    CellSnapshot::value(2, 1, "July 4"),
                ],
            ),
        ]);
        GraphService::open(MemorySource::new().with_document("doc", document), "doc").unwrap()
    }

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_closures_default_to_active_sheet() {
        let service = service();

        assert_eq!(service.dependents_of("A1"), ids(&["Sheet1!B1", "Sheet1!C1"]));
        assert_eq!(
            service.dependencies_of("Sheet1!C1"),
            ids(&["Deals!A1", "Sheet1!A1", "Sheet1!B1"])
        );
        assert_eq!(service.dependents_of("deals!a1"), BTreeSet::new());
        assert_eq!(service.dependents_of("Deals!A1"), ids(&["Sheet1!C1"]));
        assert!(service.dependencies_of("NoSuchSheet!Z9").is_empty());
        assert!(service.dependencies_of("not a cell").is_empty());
    }

    #[test]
    fn test_execute_messages() {
        let service = service();

        let outcome = service.execute(&CommandDescriptor::new(Command::ImpactAnalysis).with_target("A1"));
        assert!(outcome.success);
        assert_eq!(
            outcome.message,
            "Impact analysis for A1: 2 cells affected\nCells affected:\n  Sheet1!B1\n  Sheet1!C1\n"
        );

        let outcome = service.execute(&CommandDescriptor::new(Command::DependencyAnalysis).with_target("A1"));
        assert_eq!(
            outcome.message,
            "Dependency analysis for A1: 0 dependencies\nNo dependencies found for A1"
        );

        let outcome = service.execute(&CommandDescriptor::new(Command::ListSheets));
        assert_eq!(outcome.message, "Sheets in this spreadsheet:\n1. Sheet1\n2. Deals\n");

        let outcome = service.execute(&CommandDescriptor::new(Command::ListFormulas));
        assert_eq!(
            outcome.message,
            "Found 2 cells with formulas:\n1. Sheet1!B1: =A1*2\n2. Sheet1!C1: =B1+Deals!A1\n"
        );
    }

    #[test]
    fn test_execute_rejects_malformed_descriptors() {
        let service = service();
        let message = |d: CommandDescriptor| service.execute(&d).message;

        assert_eq!(message(CommandDescriptor::default()), "Invalid query: missing 'command' field");
        assert_eq!(
            message(CommandDescriptor {
                command: Some(" ".into()),
                ..Default::default()
            }),
            "Invalid query: empty 'command' field"
        );
        assert_eq!(
            message(CommandDescriptor {
                command: Some("drop".into()),
                ..Default::default()
            }),
            "Unknown command: drop"
        );
        assert_eq!(
            message(CommandDescriptor::new(Command::ImpactAnalysis)),
            "Impact analysis requires a target cell"
        );
        assert_eq!(
            message(CommandDescriptor::new(Command::DependencyAnalysis).with_target("")),
            "Target cell cannot be empty"
        );
        assert_eq!(
            message(CommandDescriptor::new(Command::UpdateCell).with_target("A1")),
            "Update cell requires a new value"
        );
        assert_eq!(message(CommandDescriptor::new(Command::Error)), "Unknown error");
        assert_eq!(message(CommandDescriptor::error("bad question")), "bad question");
        assert!(!service.execute_json("{ nope").success);
    }

    #[test]
    fn test_find_cells() {
        let service = service();

        let outcome = service.find_cells(Some("deals"), "");
        assert_eq!(outcome.message, "Cells in sheet 'deals':\n1. A1: Revenue $500\n2. A2: July 4\n");

        let outcome = service.find_cells(None, "date");
        assert_eq!(outcome.message, "Found 1 cells containing date-related data");

        let outcome = service.find_cells(None, "financial");
        assert_eq!(outcome.data.map(|d| d.len()), Some(1));

        let outcome = service.find_cells(None, "anything");
        assert_eq!(
            outcome.message,
            "Found 5 sample cells across all sheets (use more specific search terms)"
        );
    }

    #[test]
    fn test_sheet_listing_is_capped() {
        let service = service().with_find_options(FindOptions {
            sheet_limit: 2,
            ..Default::default()
        });

        let outcome = service.find_cells(Some("Sheet1"), "");
        assert_eq!(outcome.message, "Cells in sheet 'Sheet1':\n1. A1: 10\n2. B1: =A1*2\n... and 1 more cells");
    }

    #[test]
    fn test_update_cell_reloads() {
        let service = service();

        let outcome = service.execute(
            &CommandDescriptor::new(Command::UpdateCell)
                .with_target("D1")
                .with_value("=C1"),
        );
        assert!(outcome.success);
        assert_eq!(outcome.message, "Cell D1 updated to =C1");
        assert!(service.dependents_of("A1").contains("Sheet1!D1"));

        let outcome = service.execute(
            &CommandDescriptor::new(Command::UpdateCell)
                .with_target("Missing!A1")
                .with_value("1"),
        );
        assert!(!outcome.success);
    }

    /// Holds the first armed fetch until released, after it has read the document
    struct GatedSource {
        inner: MemorySource,
        armed: AtomicBool,
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl SnapshotSource for GatedSource {
        fn fetch_all_sheets(&self, document_id: &str) -> SourceResult<DocumentSnapshot> {
            let document = self.inner.fetch_all_sheets(document_id)?;
            if self.armed.swap(false, Ordering::SeqCst) {
                let _ = self.entered.send(());
                let _ = self.release.recv();
            }
            Ok(document)
        }

        fn fetch_last_modified(&self, document_id: &str) -> SourceResult<DateTime<Utc>> {
            self.inner.fetch_last_modified(document_id)
        }

        fn write_cell(&self, document_id: &str, sheet: &str, a1: &str, value: &str) -> SourceResult<()> {
            self.inner.write_cell(document_id, sheet, a1, value)
        }
    }

    #[test]
    fn test_slow_reload_does_not_overwrite_newer_graph() {
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        let source = GatedSource {
            inner: MemorySource::new().with_document(
                "doc",
                DocumentSnapshot::new(vec![SheetSnapshot::new(
                    "Sheet1",
                    vec![CellSnapshot::value(1, 1, "1")],
                )]),
            ),
            armed: AtomicBool::new(false),
            entered: entered_tx,
            release: release_rx,
        };
        let service = Arc::new(GraphService::open(source, "doc").unwrap());
        service.source().armed.store(true, Ordering::SeqCst);

        // a background reload reads the old document and stalls
        let slow = {
            let service = Arc::clone(&service);
            thread::spawn(move || service.reload().unwrap())
        };
        entered_rx.recv().unwrap();

        // a write lands and triggers its own reload meanwhile
        service.source().inner.write_cell("doc", "Sheet1", "B1", "=A1").unwrap();
        let fresh = {
            let service = Arc::clone(&service);
            thread::spawn(move || service.reload().unwrap())
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        assert_eq!(slow.join().unwrap().cell_count, 1);
        assert_eq!(fresh.join().unwrap().cell_count, 2);
        assert_eq!(service.summary().cell_count, 2);
        assert!(service.dependents_of("A1").contains("Sheet1!B1"));
    }
}
