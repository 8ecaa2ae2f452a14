//! Retirement statement import. Each statement is a CSV export named
//! `TSP_Balance_YYYY_MM_DD.csv`; statements newer than the last one recorded
//! on the retirement sheet are appended to it one row each.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use tally_core::sheet::column_name;
use tally_core::{CellRef, DateError, DateFormat, Issue, IssueKind, LedgerStore, StoreError};

const STATEMENT_PREFIX: &str = "TSP_Balance_";
const STATEMENT_SUFFIX: &str = ".csv";

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Statement has no row {0}")]
    MissingRow(usize),
    #[error("No {fund} balance in column {col}")]
    MissingCell { fund: String, col: usize },
    #[error("Invalid {fund} balance: '{value}'")]
    InvalidAmount { fund: String, value: String },
    #[error("Latest recorded statement date is unreadable: {0}")]
    RecordedDate(#[from] DateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A fund's position in the statement export and on the retirement sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundColumn {
    pub fund: String,
    pub statement_col: usize,
    pub sheet_col: u32,
}

impl FundColumn {
    fn new(fund: &str, statement_col: usize, sheet_col: u32) -> Self {
        Self {
            fund: fund.to_string(),
            statement_col,
            sheet_col,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetirementLayout {
    pub sheet: String,
    pub first_row: u32,
    pub date_col: u32,
    pub frequency_col: u32,
    pub frequency_label: String,
    pub total_col: u32,
    /// Zero-based row of the statement export holding the balances.
    pub statement_row: usize,
    pub funds: Vec<FundColumn>,
}

impl Default for RetirementLayout {
    fn default() -> Self {
        Self {
            sheet: "Retirement".to_string(),
            first_row: 2,
            date_col: 0,
            frequency_col: 1,
            frequency_label: "Biweekly".to_string(),
            total_col: 3,
            statement_row: 3,
            funds: vec![
                FundColumn::new("L2050", 3, 9),
                FundColumn::new("G", 8, 5),
                FundColumn::new("C", 10, 6),
                FundColumn::new("S", 11, 7),
                FundColumn::new("I", 12, 8),
            ],
        }
    }
}

impl RetirementLayout {
    /// `=SUM(F3:J3)` over the fund columns of the given row.
    fn total_formula(&self, row: u32) -> Option<String> {
        let first = self.funds.iter().map(|f| f.sheet_col).min()?;
        let last = self.funds.iter().map(|f| f.sheet_col).max()?;
        let n = row + 1;
        Some(format!("=SUM({}{n}:{}{n})", column_name(first), column_name(last)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetirementStatement {
    pub date: NaiveDate,
    /// In layout fund order.
    pub balances: Vec<(String, Decimal)>,
}

#[derive(Debug, Clone, Default)]
pub struct StatementImport {
    pub recorded: Vec<NaiveDate>,
    pub issues: Vec<Issue>,
}

/// The statement date encoded in a file name, or `None` if the name is not a
/// statement export.
pub fn statement_date(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name
        .strip_prefix(STATEMENT_PREFIX)?
        .strip_suffix(STATEMENT_SUFFIX)?;
    NaiveDate::parse_from_str(stem, "%Y_%m_%d").ok()
}

/// Statement files in `dir`, oldest first.
pub fn statement_files(dir: &Path) -> Result<Vec<(NaiveDate, PathBuf)>, StatementError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(date) = path.file_name().and_then(|n| n.to_str()).and_then(statement_date) else {
            continue;
        };
        files.push((date, path));
    }
    files.sort();
    Ok(files)
}

pub fn parse_statement<R: Read>(
    data: R,
    date: NaiveDate,
    layout: &RetirementLayout,
) -> Result<RetirementStatement, StatementError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let record = reader
        .records()
        .nth(layout.statement_row)
        .transpose()?
        .ok_or(StatementError::MissingRow(layout.statement_row))?;

    let balances = layout
        .funds
        .iter()
        .map(|f| {
            let raw = record
                .get(f.statement_col)
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| StatementError::MissingCell {
                    fund: f.fund.clone(),
                    col: f.statement_col,
                })?;
            let value = parse_balance(raw).ok_or_else(|| StatementError::InvalidAmount {
                fund: f.fund.clone(),
                value: raw.to_string(),
            })?;
            Ok((f.fund.clone(), value))
        })
        .collect::<Result<Vec<_>, StatementError>>()?;

    Ok(RetirementStatement { date, balances })
}

fn parse_balance(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let value = Decimal::from_str(&s.replace([',', '$', ' '], "")).ok()?;
    Some(if negative { -value } else { value })
}

/// Date of the last recorded statement and the row the next one goes in.
pub fn latest_recorded<S: LedgerStore + ?Sized>(
    store: &S,
    layout: &RetirementLayout,
) -> Result<(Option<NaiveDate>, u32), StatementError> {
    let mut row = layout.first_row;
    let mut last = None;
    loop {
        let value = store.read(&layout.sheet, CellRef::new(row, layout.date_col))?;
        if value.is_empty() {
            break;
        }
        last = Some(value.to_string());
        row += 1;
    }
    let latest = last.map(|s| DateFormat::ShortYear.parse(&s)).transpose()?;
    Ok((latest, row))
}

pub fn record_statement<S: LedgerStore + ?Sized>(
    store: &mut S,
    layout: &RetirementLayout,
    row: u32,
    statement: &RetirementStatement,
) -> Result<(), StoreError> {
    let sheet = layout.sheet.as_str();
    for (fund, value) in &statement.balances {
        if let Some(col) = layout.funds.iter().find(|f| &f.fund == fund) {
            store.write_number(sheet, CellRef::new(row, col.sheet_col), *value)?;
        }
    }
    if let Some(formula) = layout.total_formula(row) {
        store.write_formula(sheet, CellRef::new(row, layout.total_col), &formula)?;
    }
    store.write_text(sheet, CellRef::new(row, layout.frequency_col), &layout.frequency_label)?;
    store.write_text(
        sheet,
        CellRef::new(row, layout.date_col),
        &DateFormat::ShortYear.format(statement.date),
    )?;
    Ok(())
}

/// Append every statement in `dir` newer than the latest recorded one.
/// Unreadable statements are reported and skipped.
pub fn import_statements<S: LedgerStore + ?Sized>(
    store: &mut S,
    layout: &RetirementLayout,
    dir: &Path,
) -> Result<StatementImport, StatementError> {
    let (latest, mut next_row) = latest_recorded(store, layout)?;
    let mut out = StatementImport::default();

    for (date, path) in statement_files(dir)? {
        if latest.is_some_and(|l| date <= l) {
            continue;
        }
        tracing::info!("Importing retirement statement from: {}", path.display());
        let parsed = std::fs::File::open(&path)
            .map_err(StatementError::from)
            .and_then(|file| parse_statement(file, date, layout));
        match parsed {
            Ok(statement) => {
                record_statement(store, layout, next_row, &statement)?;
                next_row += 1;
                out.recorded.push(date);
            }
            Err(e) => {
                tracing::warn!("Skipping retirement statement {}: {e}", path.display());
                out.issues.push(Issue::new(
                    IssueKind::MalformedInput,
                    path.display().to_string(),
                    e.to_string(),
                ));
            }
        }
    }
    Ok(out)
}
