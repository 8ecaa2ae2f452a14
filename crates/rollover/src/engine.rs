use chrono::NaiveDate;

use tally_core::{
    bin_total, bin_total_all, Cadence, CategoryCatalog, DateRange, Issue, IssueKind, LedgerRecord, LedgerStore,
    RunReport,
};

use crate::error::RolloverError;
use crate::headers::{find_headers, PeriodHeader};
use crate::layout::TrackingLayout;

/// Upper bound on periods created by a single run unless configured otherwise.
/// Ten years of biweekly periods.
pub const DEFAULT_MAX_PERIODS_PER_RUN: u64 = 260;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodState {
    /// The period after the latest end has not finished yet.
    Current { latest_end: NaiveDate },
    Behind { latest_end: NaiveDate, periods_due: u64 },
}

impl PeriodState {
    pub fn latest_end(self) -> NaiveDate {
        match self {
            PeriodState::Current { latest_end } | PeriodState::Behind { latest_end, .. } => latest_end,
        }
    }

    pub fn periods_due(self) -> u64 {
        match self {
            PeriodState::Current { .. } => 0,
            PeriodState::Behind { periods_due, .. } => periods_due,
        }
    }
}

pub struct RolloverEngine {
    layout: TrackingLayout,
    catalog: CategoryCatalog,
    cadence: Cadence,
    max_periods: u64,
}

impl RolloverEngine {
    pub fn new(layout: TrackingLayout, catalog: CategoryCatalog) -> Self {
        Self {
            layout,
            catalog,
            cadence: Cadence::default(),
            max_periods: DEFAULT_MAX_PERIODS_PER_RUN,
        }
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_max_periods(mut self, max_periods: u64) -> Self {
        self.max_periods = max_periods;
        self
    }

    pub fn layout(&self) -> &TrackingLayout {
        &self.layout
    }

    pub fn latest_end<S: LedgerStore + ?Sized>(&self, store: &S) -> Result<NaiveDate, RolloverError> {
        let sheet = &self.layout.sheet;
        let cell = self.layout.latest_date_cell();
        let value = store.read(sheet, cell)?;
        if value.is_empty() {
            return Err(RolloverError::MissingPeriodDate {
                sheet: sheet.clone(),
                cell,
            });
        }
        self.layout
            .date_format
            .parse(&value.to_string())
            .map_err(|source| RolloverError::MalformedPeriodDate {
                sheet: sheet.clone(),
                cell,
                source,
            })
    }

    pub fn state<S: LedgerStore + ?Sized>(&self, store: &S, today: NaiveDate) -> Result<PeriodState, RolloverError> {
        let latest_end = self.latest_end(store)?;
        Ok(match self.cadence.periods_due(latest_end, today) {
            0 => PeriodState::Current { latest_end },
            periods_due => PeriodState::Behind { latest_end, periods_due },
        })
    }

    /// The periods a run would create, oldest first.
    pub fn plan<S: LedgerStore + ?Sized>(&self, store: &S, today: NaiveDate) -> Result<Vec<DateRange>, RolloverError> {
        let state = self.state(store, today)?;
        let due = state.periods_due();
        if due > self.max_periods {
            return Err(RolloverError::CatchUpLimit {
                due,
                cap: self.max_periods,
            });
        }
        let mut start = state.latest_end();
        let mut ranges = Vec::with_capacity(due as usize);
        for _ in 0..due {
            let end = self.cadence.next_end(start);
            ranges.push(DateRange::new(start, end));
            start = end;
        }
        Ok(ranges)
    }

    /// Append every period that has finished by `today`, one at a time.
    ///
    /// Does nothing when the sheet is current. Date and limit checks happen
    /// before the first write; a store failure mid-run returns early and the
    /// caller should discard the store.
    pub fn run<S: LedgerStore + ?Sized>(
        &self,
        store: &mut S,
        records: &[LedgerRecord],
        today: NaiveDate,
    ) -> Result<RunReport, RolloverError> {
        let mut report = RunReport::new();
        let ranges = self.plan(store, today)?;
        if ranges.is_empty() {
            tracing::info!("Periods are current as of {today}");
            return Ok(report);
        }

        let headers = find_headers(store, &self.layout)?;
        tracing::debug!("Found {} period headers", headers.len());

        for range in ranges {
            tracing::info!("Adding new column for period beginning {}", range.start);
            self.add_period(store, &headers, records, range, &mut report)?;
            report.periods_created.push(range);
        }
        Ok(report)
    }

    fn add_period<S: LedgerStore + ?Sized>(
        &self,
        store: &mut S,
        headers: &[PeriodHeader],
        records: &[LedgerRecord],
        range: DateRange,
        report: &mut RunReport,
    ) -> Result<(), RolloverError> {
        let layout = &self.layout;
        let sheet = layout.sheet.as_str();

        store.insert_column(sheet, layout.axis_col)?;
        store.write_text(sheet, layout.latest_date_cell(), &layout.date_format.format(range.end))?;

        for header in headers {
            let net = format!(
                "={}-{}",
                layout.value_ref(layout.target_row(header.row)),
                layout.value_ref(header.row)
            );
            store.write_formula(sheet, layout.value_cell(layout.net_row_for(header.row)), &net)?;

            let found = self.catalog.target(&header.category).and_then(|target| {
                self.catalog
                    .subcategories(&header.category)
                    .map(|subs| (target, subs))
            });
            let (target, subcategories) = match found {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Skipping header at row {} for period {range}: {e}", header.row + 1);
                    report.push(Issue::new(
                        IssueKind::UnknownCategory,
                        header.category.clone(),
                        format!("{e}; actual and target for period {range} left blank"),
                    ));
                    continue;
                }
            };

            let actual = bin_total_all(range, subcategories, records);
            tracing::debug!("{}: actual {actual}, target {target}", header.category);

            store.write_number(sheet, layout.value_cell(header.row), actual.as_decimal())?;
            store.write_number(sheet, layout.value_cell(layout.target_row(header.row)), target.as_decimal())?;
        }

        for line in &layout.income_lines {
            let total = bin_total(range, &line.category, records);
            store.write_number(sheet, layout.value_cell(line.row), total.as_decimal())?;
        }

        store.write_formula(sheet, layout.value_cell(layout.income_total_row), &layout.income_total_formula())?;
        store.write_formula(sheet, layout.value_cell(layout.expense_total_row), &self.expense_total_formula(headers))?;
        store.write_formula(sheet, layout.value_cell(layout.net_row), &layout.net_savings_formula())?;
        Ok(())
    }

    /// Explicit sum of the actual cells of every counted header.
    fn expense_total_formula(&self, headers: &[PeriodHeader]) -> String {
        let cells: Vec<String> = headers
            .iter()
            .filter(|h| !self.layout.is_excluded(h))
            .map(|h| self.layout.value_ref(h.row))
            .collect();
        if cells.is_empty() {
            "=0".to_string()
        } else {
            format!("={}", cells.join("+"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{CellRef, CellValue, Money, RecordSource, Workbook};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(cents: i64, d: NaiveDate, category: &str) -> LedgerRecord {
        LedgerRecord::new(Money::from_cents(cents), d, category, RecordSource::Cash)
    }

    fn catalog() -> CategoryCatalog {
        CategoryCatalog::from_json(
            r#"{
                "FOOD": {"groceries": 300, "dining": 100},
                "HOME": {"rent": 1200}
            }"#,
        )
        .unwrap()
    }

    /// Latest end 01/05/24, previous 12/22/23; headers FOOD, HOME, PETS.
    fn tracking() -> Workbook {
        let layout = TrackingLayout::default();
        let mut wb = Workbook::new();
        wb.add_sheet(&layout.sheet);
        let s = layout.sheet.as_str();
        wb.write_text(s, CellRef::new(1, 2), "01/05/24").unwrap();
        wb.write_text(s, CellRef::new(1, 3), "12/22/23").unwrap();
        wb.write_text(s, CellRef::new(10, 0), "[FOOD] Food").unwrap();
        wb.write_text(s, CellRef::new(13, 0), "[HOME] Home").unwrap();
        wb.write_text(s, CellRef::new(16, 0), "[PETS] Pets").unwrap();
        // Last period's values, filled in by an earlier run.
        wb.write_number(s, CellRef::new(10, 3), "42".parse().unwrap()).unwrap();
        wb.write_formula(s, CellRef::new(12, 3), "=D12-D11").unwrap();
        wb
    }

    fn engine() -> RolloverEngine {
        RolloverEngine::new(TrackingLayout::default(), catalog())
    }

    fn cell(wb: &Workbook, row: u32, col: u32) -> CellValue {
        wb.read("Tracking", CellRef::new(row, col)).unwrap()
    }

    fn number(s: &str) -> CellValue {
        CellValue::Number(s.parse().unwrap())
    }

    fn formula(s: &str) -> CellValue {
        CellValue::Formula(s.to_string())
    }

    #[test]
    fn current_sheet_is_left_alone() {
        let mut wb = tracking();
        let before = wb.clone();
        // Five and thirteen days past the latest end: that period is still running.
        for today in [date(2024, 1, 5), date(2024, 1, 1), date(2024, 1, 10), date(2024, 1, 18)] {
            let report = engine().run(&mut wb, &[], today).unwrap();
            assert!(report.periods_created.is_empty());
            assert!(report.is_clean());
            assert_eq!(wb, before);
        }
    }

    #[test]
    fn state_reports_periods_due() {
        let wb = tracking();
        assert_eq!(
            engine().state(&wb, date(2024, 1, 5)).unwrap(),
            PeriodState::Current { latest_end: date(2024, 1, 5) }
        );
        assert_eq!(
            engine().state(&wb, date(2024, 1, 18)).unwrap(),
            PeriodState::Current { latest_end: date(2024, 1, 5) }
        );
        assert_eq!(
            engine().state(&wb, date(2024, 1, 19)).unwrap(),
            PeriodState::Behind { latest_end: date(2024, 1, 5), periods_due: 1 }
        );
        assert_eq!(engine().state(&wb, date(2024, 2, 20)).unwrap().periods_due(), 3);
        assert_eq!(engine().state(&wb, date(2024, 3, 1)).unwrap().periods_due(), 4);
    }

    #[test]
    fn one_period_fills_targets_actuals_and_formulas() {
        let mut wb = tracking();
        let records = vec![
            rec(5000, date(2024, 1, 5), "groceries"),
            rec(2000, date(2024, 1, 18), "dining"),
            rec(9900, date(2024, 1, 19), "groceries"),
            rec(120000, date(2024, 1, 1), "rent"),
            LedgerRecord::new(Money::from_cents(310000), date(2024, 1, 12), "Gross Pay", RecordSource::Paystub),
        ];

        let report = engine().run(&mut wb, &records, date(2024, 1, 19)).unwrap();
        assert_eq!(report.periods_created, vec![DateRange::new(date(2024, 1, 5), date(2024, 1, 19))]);

        // New end date at the axis; the old one moved right and labels the period.
        assert_eq!(cell(&wb, 1, 2), CellValue::Text("01/19/24".into()));
        assert_eq!(cell(&wb, 1, 3), CellValue::Text("01/05/24".into()));
        assert_eq!(cell(&wb, 1, 4), CellValue::Text("12/22/23".into()));

        assert_eq!(cell(&wb, 10, 3), number("70.00"));
        assert_eq!(cell(&wb, 11, 3), number("400"));
        assert_eq!(cell(&wb, 12, 3), formula("=D12-D11"));
        assert_eq!(cell(&wb, 13, 3), number("0"));
        assert_eq!(cell(&wb, 14, 3), number("1200"));
        assert_eq!(cell(&wb, 15, 3), formula("=D15-D14"));

        assert_eq!(cell(&wb, 4, 3), number("3100.00"));
        assert_eq!(cell(&wb, 5, 3), number("0"));
        assert_eq!(cell(&wb, 3, 3), formula("=SUM(D5:D8)"));
        assert_eq!(cell(&wb, 8, 3), formula("=D11+D14+D17"));
        assert_eq!(cell(&wb, 9, 3), formula("=D4-D9"));

        // The previous period shifted right with its references.
        assert_eq!(cell(&wb, 10, 4), number("42"));
        assert_eq!(cell(&wb, 12, 4), formula("=E12-E11"));
    }

    #[test]
    fn unknown_category_is_skipped_and_reported() {
        let mut wb = tracking();
        let report = engine().run(&mut wb, &[], date(2024, 1, 19)).unwrap();
        assert_eq!(report.count(IssueKind::UnknownCategory), 1);
        assert_eq!(report.issues[0].subject, "PETS");
        assert!(cell(&wb, 16, 3).is_empty());
        assert!(cell(&wb, 17, 3).is_empty());
        // The net formula is positional and is written regardless.
        assert_eq!(cell(&wb, 18, 3), formula("=D18-D17"));
        // Other headers were still filled.
        assert_eq!(cell(&wb, 14, 3), number("1200"));
    }

    #[test]
    fn catch_up_creates_each_missing_period() {
        let mut wb = tracking();
        let today = date(2024, 3, 1);
        let report = engine().run(&mut wb, &[], today).unwrap();
        let ends: Vec<NaiveDate> = report.periods_created.iter().map(|r| r.end).collect();
        assert_eq!(
            ends,
            vec![date(2024, 1, 19), date(2024, 2, 2), date(2024, 2, 16), date(2024, 3, 1)]
        );
        let row: Vec<CellValue> = (2..8).map(|c| cell(&wb, 1, c)).collect();
        let expected: Vec<CellValue> = ["03/01/24", "02/16/24", "02/02/24", "01/19/24", "01/05/24", "12/22/23"]
            .into_iter()
            .map(|s| CellValue::Text(s.into()))
            .collect();
        assert_eq!(row, expected);
        assert_eq!(report.count(IssueKind::UnknownCategory), 4);

        let again = engine().run(&mut wb, &[], today).unwrap();
        assert!(again.periods_created.is_empty());
    }

    #[test]
    fn each_period_bins_its_own_range() {
        let mut wb = tracking();
        let records = vec![rec(1000, date(2024, 1, 10), "dining"), rec(3000, date(2024, 1, 25), "dining")];
        engine().run(&mut wb, &records, date(2024, 2, 2)).unwrap();
        // 01/19 - 02/02 is in column D, 01/05 - 01/19 in column E.
        assert_eq!(cell(&wb, 10, 3), number("30.00"));
        assert_eq!(cell(&wb, 10, 4), number("10.00"));
        assert_eq!(cell(&wb, 12, 4), formula("=E12-E11"));
    }

    #[test]
    fn catch_up_limit_is_checked_before_any_write() {
        let mut wb = tracking();
        let before = wb.clone();
        let err = engine()
            .with_max_periods(2)
            .run(&mut wb, &[], date(2024, 3, 1))
            .unwrap_err();
        assert!(matches!(err, RolloverError::CatchUpLimit { due: 4, cap: 2 }));
        assert_eq!(wb, before);
    }

    #[test]
    fn cadence_controls_period_length() {
        let mut wb = tracking();
        let report = engine()
            .with_cadence(Cadence::new(7).unwrap())
            .run(&mut wb, &[], date(2024, 1, 26))
            .unwrap();
        assert_eq!(report.periods_created.len(), 3);
        assert_eq!(cell(&wb, 1, 2), CellValue::Text("01/26/24".into()));
    }

    #[test]
    fn excluded_categories_leave_the_expense_total() {
        let mut wb = tracking();
        let layout = TrackingLayout {
            excluded_from_expenses: vec!["HOME".into()],
            ..TrackingLayout::default()
        };
        RolloverEngine::new(layout, catalog()).run(&mut wb, &[], date(2024, 1, 19)).unwrap();
        assert_eq!(cell(&wb, 8, 3), formula("=D11+D17"));
    }

    #[test]
    fn default_layout_leaves_row_48_out_of_the_expense_total() {
        let mut wb = tracking();
        wb.write_text("Tracking", CellRef::new(47, 0), "[HOME] Savings").unwrap();
        engine().run(&mut wb, &[], date(2024, 1, 19)).unwrap();
        assert_eq!(cell(&wb, 8, 3), formula("=D11+D14+D17"));
        // Still filled like any other header.
        assert_eq!(cell(&wb, 48, 3), number("1200"));
    }

    #[test]
    fn running_period_is_filled_once_it_ends() {
        let mut wb = tracking();
        let records = vec![rec(1000, date(2024, 1, 8), "dining"), rec(1000, date(2024, 1, 15), "dining")];
        let before = wb.clone();
        let report = engine().run(&mut wb, &records, date(2024, 1, 10)).unwrap();
        assert!(report.periods_created.is_empty());
        assert_eq!(wb, before);

        let report = engine().run(&mut wb, &records, date(2024, 1, 25)).unwrap();
        assert_eq!(report.periods_created, vec![DateRange::new(date(2024, 1, 5), date(2024, 1, 19))]);
        assert_eq!(cell(&wb, 10, 3), number("20.00"));
    }

    #[test]
    fn missing_or_malformed_latest_date() {
        let mut wb = tracking();
        wb.write("Tracking", CellRef::new(1, 2), CellValue::Empty).unwrap();
        assert!(matches!(
            engine().run(&mut wb, &[], date(2024, 1, 19)),
            Err(RolloverError::MissingPeriodDate { .. })
        ));

        wb.write_text("Tracking", CellRef::new(1, 2), "01/05/2024").unwrap();
        assert!(matches!(
            engine().run(&mut wb, &[], date(2024, 1, 19)),
            Err(RolloverError::MalformedPeriodDate { .. })
        ));
    }

    #[test]
    fn category_target_is_subcategory_sum() {
        let mut wb = tracking();
        engine().run(&mut wb, &[], date(2024, 1, 19)).unwrap();
        assert_eq!(cell(&wb, 11, 3), number("400"));
    }
}
