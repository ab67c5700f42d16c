//! Reference lexer
//!
//! Scans formula text for reference-shaped tokens without parsing the
//! formula itself. Functions, operators and literals are skipped; string
//! literals and error literals (`#REF!`) are consumed whole so their contents
//! never look like references.

use cellgraph_core::CellAddress;
use std::fmt;

/// A reference found in formula text
///
/// Cell tokens are normalized to upper case with `$` markers removed;
/// column letters likewise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// `A1` in the formula's own sheet
    BareCell(String),
    /// `C:C` without a sheet qualifier; never expanded to cells
    BareColumnRange { start: String, end: String },
    /// `Sheet2!A1`
    QualifiedCell { sheet: String, cell: String },
    /// `Sheet2!A:B`
    QualifiedRange {
        sheet: String,
        start: String,
        end: String,
    },
}

impl Reference {
    /// Whether the reference names a sheet explicitly
    pub fn is_qualified(&self) -> bool {
        matches!(
            self,
            Reference::QualifiedCell { .. } | Reference::QualifiedRange { .. }
        )
    }

    /// The sheet qualifier, if any
    pub fn sheet(&self) -> Option<&str> {
        match self {
            Reference::QualifiedCell { sheet, .. } | Reference::QualifiedRange { sheet, .. } => {
                Some(sheet)
            }
            Reference::BareCell(_) | Reference::BareColumnRange { .. } => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::BareCell(cell) => f.write_str(cell),
            Reference::BareColumnRange { start, end } => write!(f, "{start}:{end}"),
            Reference::QualifiedCell { sheet, cell } => write!(f, "{sheet}!{cell}"),
            Reference::QualifiedRange { sheet, start, end } => {
                write!(f, "{sheet}!{start}:{end}")
            }
        }
    }
}

/// Collect every reference in `formula`, in order of appearance
///
/// # Example
/// ```rust
/// use cellgraph_formula::{scan_references, Reference};
///
/// let refs = scan_references("=SUM(Employees!A:B) + C2");
/// assert_eq!(
///     refs,
///     vec![
///         Reference::QualifiedRange {
///             sheet: "Employees".into(),
///             start: "A".into(),
///             end: "B".into(),
///         },
///         Reference::BareCell("C2".into()),
///     ]
/// );
/// ```
pub fn scan_references(formula: &str) -> Vec<Reference> {
    ReferenceLexer::new(formula).collect()
}

/// Iterator over the references of a formula
pub struct ReferenceLexer<'a> {
    input: &'a str,
    pos: usize,
    pending: Option<Reference>,
}

impl<'a> ReferenceLexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            pending: None,
        }
    }

    fn scan(&mut self) -> Option<Reference> {
        while let Some(c) = self.peek_char() {
            match c {
                '"' => self.skip_string(),
                '#' => self.skip_error_literal(),
                '\'' => {
                    let sheet = self.scan_quoted();
                    if self.peek_char() == Some('!') {
                        self.advance();
                        if let Some(r) = self.scan_qualified(sheet) {
                            return Some(r);
                        }
                    }
                }
                c if is_word_char(c) => {
                    if let Some(r) = self.scan_word() {
                        return Some(r);
                    }
                }
                _ => self.advance(),
            }
        }
        None
    }

    /// A run of word characters: sheet qualifier, cell, column, number,
    /// function name or other identifier
    fn scan_word(&mut self) -> Option<Reference> {
        let word = self.take_word();

        if self.peek_char() == Some('!') {
            self.advance();
            return self.scan_qualified(word.to_string());
        }

        if word.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return None;
        }

        // LOG10(…) is a function call, not a cell
        if self.peek_char() == Some('(') {
            return None;
        }

        if let Some(cell) = normalize_cell(word) {
            return Some(Reference::BareCell(cell));
        }

        let start = normalize_column(word)?;
        let end = self.scan_range_end()?;
        Some(Reference::BareColumnRange { start, end })
    }

    /// Body after `sheet!`: a cell, a column range, or a cell range whose
    /// endpoints are reported as two cells
    fn scan_qualified(&mut self, sheet: String) -> Option<Reference> {
        let first = self.take_word();

        if let Some(cell) = normalize_cell(first) {
            if let Some(end) = self.scan_cell_range_end() {
                self.pending = Some(Reference::QualifiedCell {
                    sheet: sheet.clone(),
                    cell: end,
                });
            }
            return Some(Reference::QualifiedCell { sheet, cell });
        }

        let start = normalize_column(first)?;
        let end = self.scan_qualified_range_end()?;
        Some(Reference::QualifiedRange { sheet, start, end })
    }

    /// `:B` following a column; restores the position when it does not match
    fn scan_range_end(&mut self) -> Option<String> {
        self.scan_after_colon(normalize_column, false)
    }

    /// `:B` closing a column range after `sheet!`
    fn scan_qualified_range_end(&mut self) -> Option<String> {
        self.scan_after_colon(normalize_column, true)
    }

    /// `:B5` following a cell inside a qualified range
    fn scan_cell_range_end(&mut self) -> Option<String> {
        self.scan_after_colon(normalize_cell, true)
    }

    /// With `qualified` set, a malformed end is consumed so it can never be
    /// read back as a cell of the formula's own sheet. A word that starts the
    /// next qualifier or a call is always left in place.
    fn scan_after_colon(
        &mut self,
        normalize: fn(&str) -> Option<String>,
        qualified: bool,
    ) -> Option<String> {
        if self.peek_char() != Some(':') {
            return None;
        }
        let checkpoint = self.pos;
        self.advance();

        let word = self.take_word();
        if matches!(self.peek_char(), Some('!') | Some('(')) {
            self.pos = checkpoint;
            return None;
        }
        let end = normalize(word);
        if end.is_none() && !qualified {
            self.pos = checkpoint;
        }
        end
    }

    fn take_word(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek_char().map_or(false, is_word_char) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn scan_quoted(&mut self) -> String {
        self.advance(); // opening quote

        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            self.advance();
            if c == '\'' {
                if self.peek_char() == Some('\'') {
                    name.push('\'');
                    self.advance();
                } else {
                    break;
                }
            } else {
                name.push(c);
            }
        }
        name
    }

    fn skip_string(&mut self) {
        self.advance(); // opening quote

        while let Some(c) = self.peek_char() {
            self.advance();
            if c == '"' {
                if self.peek_char() == Some('"') {
                    self.advance();
                } else {
                    break;
                }
            }
        }
    }

    fn skip_error_literal(&mut self) {
        self.advance();
        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?'
        }) {
            self.advance();
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }
}

impl Iterator for ReferenceLexer<'_> {
    type Item = Reference;

    fn next(&mut self) -> Option<Reference> {
        self.pending.take().or_else(|| self.scan())
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
}

/// `A1`, `$b$12` → `A1`, `B12`
fn normalize_cell(word: &str) -> Option<String> {
    CellAddress::parse(word).ok().map(|a| a.to_a1_string())
}

/// `$c`, `AB` → `C`, `AB`
fn normalize_column(word: &str) -> Option<String> {
    let letters = word.strip_prefix('$').unwrap_or(word);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    Some(letters.to_ascii_uppercase())
}
