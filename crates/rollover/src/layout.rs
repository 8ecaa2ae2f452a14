//! Where things live on the period-tracking sheet.
//!
//! Periods run right to left: the date row holds the latest period end at
//! `axis_col`, and every column to its right holds the previous end. The
//! values in a column describe the period that begins on that column's date
//! and ends on the date one column to the left. A rollover inserts a fresh
//! column at `axis_col`, so the period it creates is filled in one column to
//! the right of the axis.

use serde::{Deserialize, Serialize};
use tally_core::sheet::column_name;
use tally_core::{CellRef, DateFormat};

use crate::headers::PeriodHeader;

/// An income row filled from ledger records of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeLine {
    pub row: u32,
    pub category: String,
}

impl IncomeLine {
    pub fn new(row: u32, category: impl Into<String>) -> Self {
        Self {
            row,
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingLayout {
    pub sheet: String,
    pub date_row: u32,
    pub axis_col: u32,
    pub date_format: DateFormat,
    pub header_col: u32,
    /// Rows scanned for headers, `[start, end)`.
    pub header_rows_start: u32,
    pub header_rows_end: u32,
    /// Target cell row relative to its header; the actual sits on the header row.
    pub target_offset: u32,
    /// Row of the `target - actual` formula relative to its header.
    pub net_offset: u32,
    pub income_lines: Vec<IncomeLine>,
    /// Inclusive bounds of the income rows summed into the income total.
    pub income_first_row: u32,
    pub income_last_row: u32,
    pub income_total_row: u32,
    pub expense_total_row: u32,
    pub net_row: u32,
    /// Header categories left out of the expense total.
    pub excluded_from_expenses: Vec<String>,
    /// Header rows left out of the expense total whatever their category.
    /// The default skips the header on sheet row 48, which tracks money set
    /// aside rather than spent.
    pub excluded_header_rows: Vec<u32>,
}

impl Default for TrackingLayout {
    fn default() -> Self {
        Self {
            sheet: "Tracking".to_string(),
            date_row: 1,
            axis_col: 2,
            date_format: DateFormat::ShortYear,
            header_col: 0,
            header_rows_start: 10,
            header_rows_end: 100,
            target_offset: 1,
            net_offset: 2,
            income_lines: vec![IncomeLine::new(4, "Gross Pay"), IncomeLine::new(5, "Bonus")],
            income_first_row: 4,
            income_last_row: 7,
            income_total_row: 3,
            expense_total_row: 8,
            net_row: 9,
            excluded_from_expenses: Vec::new(),
            excluded_header_rows: vec![47],
        }
    }
}

impl TrackingLayout {
    pub fn latest_date_cell(&self) -> CellRef {
        CellRef::new(self.date_row, self.axis_col)
    }

    /// Column that receives the values of the period a rollover creates.
    pub fn value_col(&self) -> u32 {
        self.axis_col + 1
    }

    pub fn value_cell(&self, row: u32) -> CellRef {
        CellRef::new(row, self.value_col())
    }

    pub fn target_row(&self, header_row: u32) -> u32 {
        header_row + self.target_offset
    }

    pub fn net_row_for(&self, header_row: u32) -> u32 {
        header_row + self.net_offset
    }

    pub fn is_excluded(&self, header: &PeriodHeader) -> bool {
        self.excluded_header_rows.contains(&header.row)
            || self.excluded_from_expenses.iter().any(|c| *c == header.category)
    }

    /// A1 reference to a value-column cell, e.g. `D12` for row 11.
    pub(crate) fn value_ref(&self, row: u32) -> String {
        format!("{}{}", column_name(self.value_col()), row + 1)
    }

    pub(crate) fn income_total_formula(&self) -> String {
        format!(
            "=SUM({}:{})",
            self.value_ref(self.income_first_row),
            self.value_ref(self.income_last_row)
        )
    }

    pub(crate) fn net_savings_formula(&self) -> String {
        format!(
            "={}-{}",
            self.value_ref(self.income_total_row),
            self.value_ref(self.expense_total_row)
        )
    }
}
