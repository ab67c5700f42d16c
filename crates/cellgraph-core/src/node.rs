//! Graph nodes: sheets and cells

use crate::address::{cell_id, CellAddress};
use std::fmt;

/// Discriminant of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeKind {
    Sheet,
    Cell,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Sheet => f.write_str("SHEET"),
            NodeKind::Cell => f.write_str("CELL"),
        }
    }
}

/// A node of the dependency graph
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Sheet(SheetNode),
    Cell(CellNode),
}

impl Node {
    /// Globally unique identifier
    pub fn id(&self) -> &str {
        match self {
            Node::Sheet(sheet) => sheet.id(),
            Node::Cell(cell) => cell.id(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Sheet(_) => NodeKind::Sheet,
            Node::Cell(_) => NodeKind::Cell,
        }
    }

    /// Human-readable label, e.g. `Sales!E2 (formula)`
    pub fn display_name(&self) -> String {
        match self {
            Node::Sheet(sheet) => sheet.name().to_string(),
            Node::Cell(cell) if cell.has_formula() => format!("{} (formula)", cell.id()),
            Node::Cell(cell) => cell.id().to_string(),
        }
    }

    pub fn as_cell(&self) -> Option<&CellNode> {
        match self {
            Node::Cell(cell) => Some(cell),
            Node::Sheet(_) => None,
        }
    }

    pub fn as_sheet(&self) -> Option<&SheetNode> {
        match self {
            Node::Sheet(sheet) => Some(sheet),
            Node::Cell(_) => None,
        }
    }
}

impl From<SheetNode> for Node {
    fn from(sheet: SheetNode) -> Self {
        Node::Sheet(sheet)
    }
}

impl From<CellNode> for Node {
    fn from(cell: CellNode) -> Self {
        Node::Cell(cell)
    }
}

/// A sheet (tab) of the document; its id is the sheet name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetNode {
    name: String,
}

impl SheetNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn id(&self) -> &str {
        &self.name
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A single cell: position, display value and optional formula text
///
/// The id is `sheet!A1`, derived once at construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellNode {
    id: String,
    sheet: String,
    address: CellAddress,
    a1: String,
    value: String,
    formula: Option<String>,
}

impl CellNode {
    /// Create a cell node; `row` and `column` are 1-based
    pub fn new(
        sheet: impl Into<String>,
        row: u32,
        column: u32,
        value: impl Into<String>,
        formula: Option<String>,
    ) -> Self {
        let sheet = sheet.into();
        let address = CellAddress::new(row, column);
        let a1 = address.to_a1_string();
        Self {
            id: cell_id(&sheet, &a1),
            sheet,
            address,
            a1,
            value: value.into(),
            formula,
        }
    }

    /// Full reference, e.g. `Sheet1!A1`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the owning sheet
    pub fn sheet_id(&self) -> &str {
        &self.sheet
    }

    pub fn row(&self) -> u32 {
        self.address.row
    }

    pub fn column(&self) -> u32 {
        self.address.column
    }

    pub fn address(&self) -> CellAddress {
        self.address
    }

    pub fn a1_notation(&self) -> &str {
        &self.a1
    }

    /// Display text (empty for formula cells read from most sources)
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Formula text, only if it is non-blank
    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref().filter(|f| !f.trim().is_empty())
    }

    pub fn has_formula(&self) -> bool {
        self.formula().is_some()
    }
}

impl fmt::Display for CellNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.formula() {
            Some(formula) => write!(f, "{}: {}", self.id, formula),
            None => write!(f, "{}: {}", self.id, self.value),
        }
    }
}
