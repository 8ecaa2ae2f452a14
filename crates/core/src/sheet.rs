//! Cell-addressed ledger store.
//!
//! The ledger is a workbook of named sheets. Cells are addressed by zero-based
//! `(row, col)` and rendered in A1 notation (`CellRef { row: 11, col: 3 }` is
//! `D12`). Formulas are stored as strings beginning with `=` and are kept
//! apart from literal text.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Sheet not found: {0}")]
    UnknownSheet(String),
}

// Field order gives row-major ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        CellRef { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row + 1)
    }
}

/// `0 → A`, `25 → Z`, `26 → AA`.
pub fn column_name(col: u32) -> String {
    let mut n = col + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    letters.bytes().try_fold(0u32, |acc, b| {
        b.is_ascii_uppercase().then(|| acc * 26 + u32::from(b - b'A') + 1)
    }).map(|n| n - 1)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Number(Decimal),
    Text(String),
    Formula(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Classify raw cell text the way a spreadsheet would on entry:
    /// blank → empty, leading `=` → formula, numeric → number, else text.
    pub fn from_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else if trimmed.starts_with('=') {
            CellValue::Formula(trimmed.to_string())
        } else if let Ok(n) = trimmed.parse::<Decimal>() {
            CellValue::Number(n)
        } else {
            CellValue::Text(raw.to_string())
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) | CellValue::Formula(s) => write!(f, "{s}"),
        }
    }
}

/// The addressing contract the ledger logic depends on.
pub trait LedgerStore {
    fn has_sheet(&self, sheet: &str) -> bool;

    fn read(&self, sheet: &str, at: CellRef) -> Result<CellValue, StoreError>;

    fn write(&mut self, sheet: &str, at: CellRef, value: CellValue) -> Result<(), StoreError>;

    /// Insert an empty column at `col`, shifting that column and everything to
    /// its right one place right.
    fn insert_column(&mut self, sheet: &str, col: u32) -> Result<(), StoreError>;

    fn write_number(&mut self, sheet: &str, at: CellRef, value: Decimal) -> Result<(), StoreError> {
        self.write(sheet, at, CellValue::Number(value))
    }

    fn write_text(&mut self, sheet: &str, at: CellRef, value: &str) -> Result<(), StoreError> {
        self.write(sheet, at, CellValue::Text(value.to_string()))
    }

    fn write_formula(&mut self, sheet: &str, at: CellRef, formula: &str) -> Result<(), StoreError> {
        self.write(sheet, at, CellValue::Formula(formula.to_string()))
    }

    /// Text of a cell as a spreadsheet would show it; numbers are rendered.
    fn read_string(&self, sheet: &str, at: CellRef) -> Result<String, StoreError> {
        Ok(self.read(sheet, at)?.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    cells: BTreeMap<CellRef, CellValue>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, at: CellRef) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&at).unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, at: CellRef, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&at);
        } else {
            self.cells.insert(at, value);
        }
    }

    /// Non-empty cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &CellValue)> {
        self.cells.iter().map(|(r, v)| (*r, v))
    }

    /// Exclusive row/column bounds of the used area.
    pub fn extent(&self) -> (u32, u32) {
        self.cells.keys().fold((0, 0), |(rows, cols), r| {
            (rows.max(r.row + 1), cols.max(r.col + 1))
        })
    }

    fn insert_column(&mut self, col: u32) {
        let cells = std::mem::take(&mut self.cells);
        self.cells = cells
            .into_iter()
            .map(|(at, value)| {
                let at = if at.col >= col { CellRef::new(at.row, at.col + 1) } else { at };
                let value = match value {
                    CellValue::Formula(f) => CellValue::Formula(shift_formula_columns(&f, col)),
                    other => other,
                };
                (at, value)
            })
            .collect();
    }
}

fn re_a1() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\b(\$?)([A-Z]{1,3})(\$?)([0-9]+)\b").expect("invalid regex"))
}

/// Rewrite A1 references in `formula` so references to columns at or right of
/// `inserted` point one column further right. Function names such as `SUM(`
/// and quoted text are left alone.
pub fn shift_formula_columns(formula: &str, inserted: u32) -> String {
    let mut out = String::with_capacity(formula.len() + 4);
    for (i, segment) in formula.split('"').enumerate() {
        if i > 0 {
            out.push('"');
        }
        if i % 2 == 1 {
            out.push_str(segment);
            continue;
        }
        let mut last = 0;
        for caps in re_a1().captures_iter(segment) {
            let Some(whole) = caps.get(0) else { continue };
            if segment[whole.end()..].starts_with('(') {
                continue;
            }
            let Some(col) = column_index(&caps[2]) else { continue };
            out.push_str(&segment[last..whole.start()]);
            let col = if col >= inserted { col + 1 } else { col };
            out.push_str(&format!("{}{}{}{}", &caps[1], column_name(col), &caps[3], &caps[4]));
            last = whole.end();
        }
        out.push_str(&segment[last..]);
    }
    out
}

/// In-memory workbook: sheet name → sparse cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: &str) -> &mut Sheet {
        self.sheets.entry(name.to_string()).or_default()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheets(&self) -> impl Iterator<Item = (&str, &Sheet)> {
        self.sheets.iter().map(|(n, s)| (n.as_str(), s))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet, StoreError> {
        self.sheets
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownSheet(name.to_string()))
    }
}

impl LedgerStore for Workbook {
    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheets.contains_key(sheet)
    }

    fn read(&self, sheet: &str, at: CellRef) -> Result<CellValue, StoreError> {
        self.sheets
            .get(sheet)
            .map(|s| s.get(at).clone())
            .ok_or_else(|| StoreError::UnknownSheet(sheet.to_string()))
    }

    fn write(&mut self, sheet: &str, at: CellRef, value: CellValue) -> Result<(), StoreError> {
        self.sheet_mut(sheet)?.set(at, value);
        Ok(())
    }

    fn insert_column(&mut self, sheet: &str, col: u32) -> Result<(), StoreError> {
        self.sheet_mut(sheet)?.insert_column(col);
        Ok(())
    }
}
