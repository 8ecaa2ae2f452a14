//! Ledger normalization: three expense logs, each with its own column layout
//! and date format, scanned into one sequence of [`LedgerRecord`]s.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use tally_core::{
    CellRef, CellValue, DateFormat, Issue, IssueKind, LedgerRecord, LedgerStore, Money, RecordSource,
};

/// Where one expense log lives and how its rows are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLayout {
    pub sheet: String,
    pub first_row: u32,
    pub amount_col: u32,
    pub date_col: u32,
    pub category_col: u32,
    pub date_format: DateFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLayouts {
    pub cash: SourceLayout,
    pub credit: SourceLayout,
    pub other: SourceLayout,
}

impl Default for SourceLayouts {
    fn default() -> Self {
        Self {
            cash: SourceLayout {
                sheet: "Cash".to_string(),
                first_row: 2,
                amount_col: 2,
                date_col: 3,
                category_col: 4,
                date_format: DateFormat::ShortYear,
            },
            // The card export puts the date left of the amount and uses a
            // four digit year.
            credit: SourceLayout {
                sheet: "Credit".to_string(),
                first_row: 4,
                amount_col: 5,
                date_col: 2,
                category_col: 7,
                date_format: DateFormat::LongYear,
            },
            other: SourceLayout {
                sheet: "Other".to_string(),
                first_row: 2,
                amount_col: 2,
                date_col: 3,
                category_col: 4,
                date_format: DateFormat::ShortYear,
            },
        }
    }
}

impl SourceLayouts {
    /// In scan order.
    pub fn iter(&self) -> [(RecordSource, &SourceLayout); 3] {
        [
            (RecordSource::Cash, &self.cash),
            (RecordSource::Credit, &self.credit),
            (RecordSource::Other, &self.other),
        ]
    }
}

/// Why a source scan stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEnd {
    /// Reached the first row with an empty amount cell.
    Exhausted { rows: u32 },
    /// A row could not be read; it and every row after it were skipped.
    Malformed { row: u32, reason: String },
    /// The source could not be read at all.
    Unavailable(String),
}

impl fmt::Display for ScanEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEnd::Exhausted { rows } => write!(f, "{rows} rows"),
            ScanEnd::Malformed { row, reason } => write!(f, "stopped at row {}: {reason}", row + 1),
            ScanEnd::Unavailable(why) => write!(f, "unavailable: {why}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceScan {
    pub source: RecordSource,
    pub records: Vec<LedgerRecord>,
    pub end: ScanEnd,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<LedgerRecord>,
    pub scans: Vec<(RecordSource, ScanEnd)>,
    pub issues: Vec<Issue>,
}

/// Scan cash, credit, then other. A failing source never stops the others.
pub fn normalize<S: LedgerStore + ?Sized>(store: &S, layouts: &SourceLayouts) -> Normalized {
    let mut out = Normalized::default();
    for (source, layout) in layouts.iter() {
        tracing::debug!("Reading {source} expenses...");
        let scan = scan_source(store, source, layout);
        tracing::info!("Read {} {source} expenses ({})", scan.records.len(), scan.end);
        out.records.extend(scan.records);
        out.issues.extend(scan.issues);
        out.scans.push((source, scan.end));
    }
    out
}

pub fn scan_source<S: LedgerStore + ?Sized>(store: &S, source: RecordSource, layout: &SourceLayout) -> SourceScan {
    let mut records = Vec::new();
    let mut issues = Vec::new();
    let mut row = layout.first_row;

    let end = loop {
        match read_row(store, layout, row) {
            Ok(Some((amount, date, category))) => {
                if category.is_empty() {
                    let at = CellRef::new(row, layout.category_col);
                    tracing::warn!("No category in {source} expenses at {at}");
                    issues.push(Issue::new(
                        IssueKind::ParseAbsence,
                        source.to_string(),
                        format!("no category at {at}"),
                    ));
                }
                records.push(LedgerRecord::new(amount, date, category, source));
                row += 1;
            }
            Ok(None) => break ScanEnd::Exhausted { rows: row - layout.first_row },
            Err(RowError::Malformed(reason)) => {
                match records.last() {
                    Some(last) => tracing::warn!("Malformed row in {source} expenses after {last}: {reason}"),
                    None => tracing::warn!("Malformed first row in {source} expenses: {reason}"),
                }
                issues.push(Issue::new(
                    IssueKind::MalformedInput,
                    source.to_string(),
                    format!("{reason}; skipped remaining rows"),
                ));
                break ScanEnd::Malformed { row, reason };
            }
            Err(RowError::Store(reason)) => {
                tracing::warn!("Could not read {source} expenses: {reason}");
                issues.push(Issue::new(IssueKind::ParseAbsence, source.to_string(), reason.clone()));
                break ScanEnd::Unavailable(reason);
            }
        }
    };

    SourceScan {
        source,
        records,
        end,
        issues,
    }
}

enum RowError {
    Malformed(String),
    Store(String),
}

/// `Ok(None)` marks the end of data: the amount cell is empty.
fn read_row<S: LedgerStore + ?Sized>(
    store: &S,
    layout: &SourceLayout,
    row: u32,
) -> Result<Option<(Money, chrono::NaiveDate, String)>, RowError> {
    let cell = |col| {
        store
            .read(&layout.sheet, CellRef::new(row, col))
            .map_err(|e| RowError::Store(e.to_string()))
    };

    let amount_at = CellRef::new(row, layout.amount_col);
    let amount = match cell(layout.amount_col)? {
        CellValue::Empty => return Ok(None),
        CellValue::Number(n) => n,
        CellValue::Text(s) => parse_amount(&s)
            .ok_or_else(|| RowError::Malformed(format!("'{s}' at {amount_at} is not an amount")))?,
        CellValue::Formula(f) => {
            return Err(RowError::Malformed(format!("unevaluated formula '{f}' at {amount_at}")))
        }
    };

    let date_at = CellRef::new(row, layout.date_col);
    let date = match cell(layout.date_col)? {
        CellValue::Text(s) => layout
            .date_format
            .parse(&s)
            .map_err(|e| RowError::Malformed(format!("{e} at {date_at}")))?,
        CellValue::Empty => return Err(RowError::Malformed(format!("missing date at {date_at}"))),
        other => return Err(RowError::Malformed(format!("'{other}' at {date_at} is not a date"))),
    };

    let category = match cell(layout.category_col)? {
        CellValue::Empty => String::new(),
        other => other.to_string(),
    };

    Ok(Some((Money::from_decimal(amount), date, category)))
}

fn parse_amount(s: &str) -> Option<Decimal> {
    let clean = s.trim().replace([',', '$'], "");
    Decimal::from_str(&clean).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::Workbook;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn put_row(wb: &mut Workbook, layout: &SourceLayout, row: u32, amount: &str, d: &str, category: &str) {
        let sheet = &layout.sheet;
        wb.write(sheet, CellRef::new(row, layout.amount_col), CellValue::from_input(amount)).unwrap();
        wb.write(sheet, CellRef::new(row, layout.date_col), CellValue::Text(d.to_string())).unwrap();
        wb.write(sheet, CellRef::new(row, layout.category_col), CellValue::from_input(category)).unwrap();
    }

    fn workbook(layouts: &SourceLayouts) -> Workbook {
        let mut wb = Workbook::new();
        for (_, layout) in layouts.iter() {
            wb.add_sheet(&layout.sheet);
        }
        wb
    }

    #[test]
    fn stops_at_first_empty_amount() {
        let layouts = SourceLayouts::default();
        let mut wb = workbook(&layouts);
        let cash = &layouts.cash;
        for i in 0..5 {
            put_row(&mut wb, cash, cash.first_row + i, "10.00", "01/05/24", "groceries");
        }
        // Row offset 5 has no amount; anything after it is never read.
        put_row(&mut wb, cash, cash.first_row + 6, "99.00", "01/06/24", "groceries");
        wb.write(&cash.sheet, CellRef::new(cash.first_row + 5, cash.amount_col), CellValue::Empty).unwrap();

        let scan = scan_source(&wb, RecordSource::Cash, cash);
        assert_eq!(scan.records.len(), 5);
        assert_eq!(scan.end, ScanEnd::Exhausted { rows: 5 });
        assert!(scan.issues.is_empty());
    }

    #[test]
    fn applies_each_sources_layout_and_date_format() {
        let layouts = SourceLayouts::default();
        let mut wb = workbook(&layouts);
        put_row(&mut wb, &layouts.cash, 2, "12.50", "01/05/24", "dining");
        put_row(&mut wb, &layouts.credit, 4, "80.00", "01/06/2024", "gas");
        put_row(&mut wb, &layouts.other, 2, "$1,200.00", "01/01/24", "rent");

        let n = normalize(&wb, &layouts);
        let got: Vec<(RecordSource, Money, NaiveDate, &str)> = n
            .records
            .iter()
            .map(|r| (r.source(), r.amount(), r.date(), r.category()))
            .collect();
        assert_eq!(
            got,
            vec![
                (RecordSource::Cash, Money::from_cents(1250), date(2024, 1, 5), "dining"),
                (RecordSource::Credit, Money::from_cents(8000), date(2024, 1, 6), "gas"),
                (RecordSource::Other, Money::from_cents(120000), date(2024, 1, 1), "rent"),
            ]
        );
        assert!(n.issues.is_empty());
    }

    #[test]
    fn malformed_date_skips_rest_of_that_source_only() {
        let layouts = SourceLayouts::default();
        let mut wb = workbook(&layouts);
        put_row(&mut wb, &layouts.cash, 2, "1.00", "01/05/24", "dining");
        put_row(&mut wb, &layouts.cash, 3, "2.00", "2024-01-06", "dining");
        put_row(&mut wb, &layouts.cash, 4, "3.00", "01/07/24", "dining");
        // Two-digit year in the four-digit credit log.
        put_row(&mut wb, &layouts.credit, 4, "4.00", "01/05/24", "gas");
        put_row(&mut wb, &layouts.other, 2, "5.00", "01/05/24", "rent");

        let n = normalize(&wb, &layouts);
        let amounts: Vec<Money> = n.records.iter().map(LedgerRecord::amount).collect();
        assert_eq!(amounts, vec![Money::from_cents(100), Money::from_cents(500)]);
        assert!(matches!(n.scans[0].1, ScanEnd::Malformed { row: 3, .. }));
        assert!(matches!(n.scans[1].1, ScanEnd::Malformed { row: 4, .. }));
        assert_eq!(n.scans[2].1, ScanEnd::Exhausted { rows: 1 });
        assert_eq!(n.issues.len(), 2);
        assert!(n.issues.iter().all(|i| i.kind == IssueKind::MalformedInput));
    }

    #[test]
    fn missing_sheet_does_not_stop_other_sources() {
        let layouts = SourceLayouts::default();
        let mut wb = Workbook::new();
        wb.add_sheet(&layouts.cash.sheet);
        put_row(&mut wb, &layouts.cash, 2, "7.00", "01/05/24", "dining");

        let n = normalize(&wb, &layouts);
        assert_eq!(n.records.len(), 1);
        assert!(matches!(n.scans[1].1, ScanEnd::Unavailable(_)));
        assert!(matches!(n.scans[2].1, ScanEnd::Unavailable(_)));
    }

    #[test]
    fn non_numeric_amount_is_malformed() {
        let layouts = SourceLayouts::default();
        let mut wb = workbook(&layouts);
        put_row(&mut wb, &layouts.cash, 2, "lunch", "01/05/24", "dining");
        let scan = scan_source(&wb, RecordSource::Cash, &layouts.cash);
        assert!(scan.records.is_empty());
        assert!(matches!(scan.end, ScanEnd::Malformed { row: 2, .. }));
    }

    #[test]
    fn blank_category_is_kept_and_reported() {
        let layouts = SourceLayouts::default();
        let mut wb = workbook(&layouts);
        put_row(&mut wb, &layouts.cash, 2, "3.00", "01/05/24", "");
        let scan = scan_source(&wb, RecordSource::Cash, &layouts.cash);
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.records[0].category(), "");
        assert_eq!(scan.issues[0].kind, IssueKind::ParseAbsence);
        assert_eq!(scan.end, ScanEnd::Exhausted { rows: 1 });
    }

    #[test]
    fn amounts_keep_the_precision_they_were_entered_with() {
        let layouts = SourceLayouts::default();
        let mut wb = workbook(&layouts);
        put_row(&mut wb, &layouts.cash, 2, "10.005", "01/05/24", "dining");
        put_row(&mut wb, &layouts.cash, 3, "$1,250.125", "01/06/24", "dining");
        let scan = scan_source(&wb, RecordSource::Cash, &layouts.cash);
        let amounts: Vec<Decimal> = scan.records.iter().map(|r| r.amount().as_decimal()).collect();
        assert_eq!(
            amounts,
            vec![Decimal::from_str("10.005").unwrap(), Decimal::from_str("1250.125").unwrap()]
        );
    }

    #[test]
    fn empty_source_is_exhausted_immediately() {
        let layouts = SourceLayouts::default();
        let wb = workbook(&layouts);
        let n = normalize(&wb, &layouts);
        assert!(n.records.is_empty());
        assert!(n.scans.iter().all(|(_, end)| *end == ScanEnd::Exhausted { rows: 0 }));
    }
}
