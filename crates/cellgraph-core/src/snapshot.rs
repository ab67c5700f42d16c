//! Raw cell contents as delivered by a snapshot source

/// One cell as read from the document
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellSnapshot {
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based)
    pub column: u32,
    /// Display text
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: String,
    /// Formula text, if the cell holds one
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub formula: Option<String>,
}

impl CellSnapshot {
    /// A plain value cell
    pub fn value(row: u32, column: u32, value: impl Into<String>) -> Self {
        Self {
            row,
            column,
            value: value.into(),
            formula: None,
        }
    }

    /// A formula cell with empty display text
    pub fn formula(row: u32, column: u32, formula: impl Into<String>) -> Self {
        Self {
            row,
            column,
            value: String::new(),
            formula: Some(formula.into()),
        }
    }

    pub fn has_formula(&self) -> bool {
        self.formula
            .as_deref()
            .map_or(false, |f| !f.trim().is_empty())
    }
}

/// All cells of one sheet, in source order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetSnapshot {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cells: Vec<CellSnapshot>,
}

impl SheetSnapshot {
    pub fn new(name: impl Into<String>, cells: Vec<CellSnapshot>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

/// A complete point-in-time read of every sheet
///
/// Sheets keep the order the source reported them in; the first one is the
/// document's active sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentSnapshot {
    #[cfg_attr(feature = "serde", serde(default))]
    pub sheets: Vec<SheetSnapshot>,
}

impl DocumentSnapshot {
    pub fn new(sheets: Vec<SheetSnapshot>) -> Self {
        Self { sheets }
    }

    /// Name of the first sheet, if any
    pub fn active_sheet(&self) -> Option<&str> {
        self.sheets.first().map(|s| s.name.as_str())
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetSnapshot> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut SheetSnapshot> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// Total number of cells across all sheets
    pub fn cell_count(&self) -> usize {
        self.sheets.iter().map(|s| s.cells.len()).sum()
    }
}

impl FromIterator<SheetSnapshot> for DocumentSnapshot {
    fn from_iter<I: IntoIterator<Item = SheetSnapshot>>(iter: I) -> Self {
        Self {
            sheets: iter.into_iter().collect(),
        }
    }
}
