//! A1 addressing: cell addresses and `[sheet!]A1` references

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell position in A1 notation (e.g. "A1", "AB12")
///
/// Rows and columns are 1-based, matching what snapshot sources report
/// and what users type. Absolute markers (`$`) are accepted when parsing
/// but not retained; the graph only cares about position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based, A=1, Z=26, AA=27)
    pub column: u32,
}

impl CellAddress {
    /// Create an address without bounds checking
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Create an address, rejecting positions outside the sheet limits
    pub fn checked(row: u32, column: u32) -> Result<Self> {
        if row == 0 || row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS));
        }
        if column == 0 || column > MAX_COLS {
            return Err(Error::ColumnOutOfBounds(column, MAX_COLS));
        }
        Ok(Self { row, column })
    }

    /// Parse an address from A1-style notation
    ///
    /// Column letters are case-insensitive and `$` markers are skipped.
    ///
    /// # Examples
    /// ```
    /// use cellgraph_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("B2").unwrap();
    /// assert_eq!((addr.row, addr.column), (2, 2));
    ///
    /// let addr = CellAddress::parse("$aa$10").unwrap();
    /// assert_eq!(addr.to_a1_string(), "AA10");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!("no column letters in '{s}'")));
        }
        let column = Self::letters_to_column(&s[col_start..pos])?;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() || !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!("invalid row number in '{s}'")));
        }
        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{s}'")))?;

        Self::checked(row, column)
    }

    /// Convert a 1-based column number to letters (1 = A, 26 = Z, 27 = AA)
    ///
    /// Returns an empty string for column 0, which has no letter form.
    pub fn column_to_letters(column: u32) -> String {
        let mut letters = Vec::new();
        let mut n = column;

        while n > 0 {
            n -= 1;
            letters.push((n % 26) as u8 + b'A');
            n /= 26;
        }

        letters.iter().rev().map(|&b| b as char).collect()
    }

    /// Convert column letters to a 1-based column number (A = 1, AA = 27)
    pub fn letters_to_column(letters: &str) -> Result<u32> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut column: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!("invalid column letter '{c}'")));
            }
            column = column
                .saturating_mul(26)
                .saturating_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }

        if column > MAX_COLS {
            return Err(Error::ColumnOutOfBounds(column, MAX_COLS));
        }

        Ok(column)
    }

    /// Column letters of this address
    pub fn column_letters(&self) -> String {
        Self::column_to_letters(self.column)
    }

    /// Format as an A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", self.column_letters(), self.row)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Column letters of an A1 string with the row digits stripped
///
/// `"AB12"` becomes `"AB"`. Column-range expansion compares these strings
/// directly, so no numeric conversion happens here.
pub fn column_part(a1: &str) -> &str {
    a1.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// A user-facing cell reference: `[sheet!]A1`
///
/// The sheet may be quoted (`'Q1 Sales'!B4`); quotes are removed and doubled
/// quotes inside them unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    /// Sheet qualifier, if one was given
    pub sheet: Option<String>,
    /// Position within the sheet
    pub address: CellAddress,
}

impl CellRef {
    /// Parse a reference such as `B2`, `Sales!E2` or `'My Sheet'!$C$4`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        let Some(bang) = s.rfind('!') else {
            let address = CellAddress::parse(s)
                .map_err(|_| Error::InvalidReference(s.to_string()))?;
            return Ok(Self {
                sheet: None,
                address,
            });
        };

        let sheet = unquote_sheet_name(s[..bang].trim());
        if sheet.is_empty() {
            return Err(Error::InvalidSheetName(sheet));
        }
        let address = CellAddress::parse(&s[bang + 1..])
            .map_err(|_| Error::InvalidReference(s.to_string()))?;

        Ok(Self {
            sheet: Some(sheet),
            address,
        })
    }

    /// Graph identifier of the referenced cell, using `default_sheet` when
    /// the reference carries no qualifier
    pub fn cell_id(&self, default_sheet: &str) -> String {
        let sheet = self.sheet.as_deref().unwrap_or(default_sheet);
        cell_id(sheet, &self.address.to_a1_string())
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{}!{}", sheet, self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

impl FromStr for CellRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Build the graph identifier `sheet!A1` of a cell
pub fn cell_id(sheet: &str, a1: &str) -> String {
    let mut id = String::with_capacity(sheet.len() + a1.len() + 1);
    id.push_str(sheet);
    id.push('!');
    id.push_str(a1);
    id
}

fn unquote_sheet_name(raw: &str) -> String {
    match raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}
