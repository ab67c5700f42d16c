//! Free-text questions to command descriptors
//!
//! [`CommandTranslator`] is the seam for anything that turns a question into
//! a [`CommandDescriptor`]. [`RuleBasedTranslator`] is a keyword matcher that
//! needs no external service.

use crate::command::{Command, CommandDescriptor, QueryOutcome};
use crate::query::GraphService;
use crate::shared::GraphSnapshot;
use crate::source::SnapshotSource;
use once_cell::sync::Lazy;
use regex::Regex;

/// Turns a free-text question into a structured command
pub trait CommandTranslator {
    /// `snapshot` gives access to sheet names for disambiguation
    fn translate(&self, question: &str, snapshot: &GraphSnapshot) -> CommandDescriptor;
}

static CELL_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:([A-Za-z0-9_]+)!)?(\$?[A-Z]{1,3}\$?[0-9]+)\b").expect("valid regex")
});

static SHEET_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:cells?\s+in\s+(?:the\s+)?|show\s+me\s+cells?\s+(?:in|from)\s+(?:the\s+)?|list\s+cells?\s+in\s+(?:the\s+)?|all\s+cells?\s+in\s+(?:the\s+)?)([a-z0-9 _-]+?)(?:\s+sheet)?[.?!]?$",
    )
    .expect("valid regex")
});

static DEPENDENCY_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bdependencies\b|\bdepends\s+on\b|\bdoes\b.*\bdepend\s+on\b|\buses\b|\breferences\b")
        .expect("valid regex")
});

static DATE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdates?\b").expect("valid regex"));

static UPDATE_VERB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:set|update|change)\b").expect("valid regex"));

static NEW_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bto\s+(.+)$").expect("valid regex"));

static TRAILING_NOUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:formula|value|cell|number|text)\b.*$").expect("valid regex")
});

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").expect("valid regex"));

/// Keyword rules, checked in a fixed order; the first match wins
///
/// 1. `sheets` lists the sheets
/// 2. `cells in <name> sheet` lists one sheet's cells
/// 3. date words search for dates
/// 4. money words search for financial values
/// 5. dependency phrasing with a cell asks for its dependencies
/// 6. impact phrasing with a cell asks for its dependents
/// 7. `formula` lists formula cells
/// 8. `set`/`update`/`change` with a cell and a value writes the cell
/// 9. any other cell reference asks for its dependents
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedTranslator;

impl RuleBasedTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl CommandTranslator for RuleBasedTranslator {
    fn translate(&self, question: &str, snapshot: &GraphSnapshot) -> CommandDescriptor {
        let question = question.trim();
        let lower = question.to_lowercase();
        let cell = extract_cell(question, snapshot);

        tracing::debug!(question, cell = ?cell, "translating question");

        if lower.contains("sheets") {
            return CommandDescriptor::new(Command::ListSheets)
                .with_description("List all sheets in the spreadsheet");
        }

        if lower.contains("cells in") && lower.contains("sheet") {
            if let Some(sheet) = extract_sheet_name(&lower, snapshot) {
                let description = format!("Show cells in the {sheet} sheet");
                return CommandDescriptor::new(Command::FindCells)
                    .with_sheet(sheet)
                    .with_description(description);
            }
        }

        if DATE_WORD.is_match(&lower) {
            return CommandDescriptor::new(Command::FindCells)
                .with_criteria("date")
                .with_description("Find cells containing dates");
        }

        if ["financial", "revenue", "cost", "money"]
            .iter()
            .any(|w| lower.contains(w))
        {
            return CommandDescriptor::new(Command::FindCells)
                .with_criteria("financial")
                .with_description("Find cells with financial data");
        }

        if let Some(cell) = &cell {
            if DEPENDENCY_PHRASE.is_match(&lower) {
                return CommandDescriptor::new(Command::DependencyAnalysis)
                    .with_target(cell)
                    .with_description(format!("Find all cells that {cell} depends on"));
            }
            if ["impact", "affected", "depend"].iter().any(|w| lower.contains(w)) {
                return impact(cell);
            }
        }

        if lower.contains("formula") && !UPDATE_VERB.is_match(&lower) {
            return CommandDescriptor::new(Command::ListFormulas)
                .with_description("List all cells containing formulas");
        }

        if let Some(cell) = &cell {
            if UPDATE_VERB.is_match(&lower) {
                if let Some(value) = extract_new_value(question) {
                    let description = format!("Update cell {cell} to {value}");
                    return CommandDescriptor::new(Command::UpdateCell)
                        .with_target(cell)
                        .with_value(value)
                        .with_description(description);
                }
            }
            return impact(cell);
        }

        if lower.contains("formula") {
            return CommandDescriptor::new(Command::ListFormulas)
                .with_description("List all cells containing formulas");
        }

        tracing::warn!(question, "no rule matched question");
        CommandDescriptor::error(format!("Could not understand query: {question}"))
    }
}

fn impact(cell: &str) -> CommandDescriptor {
    CommandDescriptor::new(Command::ImpactAnalysis)
        .with_target(cell)
        .with_description(format!("Find all cells affected by changing {cell}"))
}

/// First cell reference in the question, with a known sheet's name restored
/// to its real case
fn extract_cell(question: &str, snapshot: &GraphSnapshot) -> Option<String> {
    let caps = CELL_REF.captures(question)?;
    let cell = caps.get(2)?.as_str().to_ascii_uppercase();

    Some(match caps.get(1) {
        Some(sheet) => {
            let sheet = snapshot.find_sheet(sheet.as_str()).unwrap_or(sheet.as_str());
            format!("{sheet}!{cell}")
        }
        None => cell,
    })
}

/// Sheet named in "cells in the <name> sheet"; a loaded sheet matching case
/// insensitively wins over the title-cased guess
fn extract_sheet_name(lower: &str, snapshot: &GraphSnapshot) -> Option<String> {
    let caps = SHEET_PHRASE.captures(lower)?;
    let raw = caps.get(1)?.as_str().trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(sheet) = snapshot.find_sheet(raw) {
        return Some(sheet.to_string());
    }
    Some(title_case(raw))
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Text after "to", minus a trailing noun such as "formula"; failing that,
/// the first number in the question
fn extract_new_value(question: &str) -> Option<String> {
    if let Some(caps) = NEW_VALUE.captures(question) {
        let value = TRAILING_NOUN.replace(caps[1].trim(), "");
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    NUMBER.find(question).map(|m| m.as_str().to_string())
}

impl<S: SnapshotSource> GraphService<S> {
    /// Translate `question` against the current snapshot and execute it
    pub fn ask(
        &self,
        translator: &dyn CommandTranslator,
        question: &str,
    ) -> (CommandDescriptor, QueryOutcome) {
        let descriptor = translator.translate(question, &self.snapshot());
        let outcome = self.execute(&descriptor);
        (descriptor, outcome)
    }
}
