use regex::Regex;
use std::sync::OnceLock;

use tally_core::{CellRef, CellValue, LedgerStore, StoreError};

use crate::layout::TrackingLayout;

/// A category anchor row on the tracking sheet, e.g. a cell reading `[FOOD]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodHeader {
    pub category: String,
    pub row: u32,
}

fn re_header() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^\[([A-Z]+)\]").expect("invalid regex"))
}

/// The category named by a header cell's text, if it is one.
pub fn header_category(text: &str) -> Option<&str> {
    re_header()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Scan the header column over the configured row window, top to bottom.
pub fn find_headers<S: LedgerStore + ?Sized>(
    store: &S,
    layout: &TrackingLayout,
) -> Result<Vec<PeriodHeader>, StoreError> {
    let mut headers = Vec::new();
    for row in layout.header_rows_start..layout.header_rows_end {
        if let CellValue::Text(text) = store.read(&layout.sheet, CellRef::new(row, layout.header_col))? {
            if let Some(category) = header_category(&text) {
                headers.push(PeriodHeader {
                    category: category.to_string(),
                    row,
                });
            }
        }
    }
    Ok(headers)
}
