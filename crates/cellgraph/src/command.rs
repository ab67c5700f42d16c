//! Structured commands and their results
//!
//! A [`CommandDescriptor`] is the JSON-shaped request produced by a
//! translator (or typed by hand); [`GraphService::execute`] answers it with a
//! [`QueryOutcome`]. Both serialize with snake_case field names.
//!
//! [`GraphService::execute`]: crate::GraphService::execute

use cellgraph_core::CellNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The fixed command vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ImpactAnalysis,
    DependencyAnalysis,
    ListFormulas,
    ListSheets,
    FindCells,
    UpdateCell,
    Error,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::ImpactAnalysis,
        Command::DependencyAnalysis,
        Command::ListFormulas,
        Command::ListSheets,
        Command::FindCells,
        Command::UpdateCell,
        Command::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::ImpactAnalysis => "impact_analysis",
            Command::DependencyAnalysis => "dependency_analysis",
            Command::ListFormulas => "list_formulas",
            Command::ListSheets => "list_sheets",
            Command::FindCells => "find_cells",
            Command::UpdateCell => "update_cell",
            Command::Error => "error",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command name outside the vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

/// A request against the graph
///
/// Every field is optional on the wire; which ones are required depends on
/// the command and is checked when the descriptor is executed. `command` is
/// kept as text so unknown names can be reported back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_cell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandDescriptor {
    pub fn new(command: Command) -> Self {
        Self {
            command: Some(command.to_string()),
            ..Default::default()
        }
    }

    /// An `error` command carrying `message`
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(Command::Error)
        }
    }

    pub fn with_target(mut self, cell: impl Into<String>) -> Self {
        self.target_cell = Some(cell.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet.into());
        self
    }

    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = Some(criteria.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The parsed command, if present and known
    pub fn parsed_command(&self) -> Option<Command> {
        self.command.as_deref().and_then(|c| c.parse().ok())
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        // serializing plain strings and options cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Payload attached to a successful outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum QueryData {
    /// Cell ids, sorted
    CellIds(Vec<String>),
    /// Full cell records
    Cells(Vec<CellNode>),
    /// Sheet names in document order
    Sheets(Vec<String>),
}

impl QueryData {
    pub fn len(&self) -> usize {
        match self {
            QueryData::CellIds(ids) => ids.len(),
            QueryData::Cells(cells) => cells.len(),
            QueryData::Sheets(sheets) => sheets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of executing a [`CommandDescriptor`]
///
/// Malformed or unknown commands are failures here rather than `Err`s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<QueryData>,
}

impl QueryOutcome {
    pub fn ok(message: impl Into<String>, data: Option<QueryData>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
