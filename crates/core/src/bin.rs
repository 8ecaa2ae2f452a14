//! Period binning: select the records of one category inside a half-open
//! date range, and reduce them to a total.
//!
//! Category matching is exact string equality. No case folding or whitespace
//! trimming is applied, so `"Dining"` and `"dining "` are different categories.

use super::money::Money;
use super::period::DateRange;
use super::record::LedgerRecord;

pub fn bin<'a>(range: DateRange, category: &str, records: &'a [LedgerRecord]) -> Vec<&'a LedgerRecord> {
    records
        .iter()
        .filter(|r| r.category() == category && range.contains(r.date()))
        .collect()
}

pub fn bin_total(range: DateRange, category: &str, records: &[LedgerRecord]) -> Money {
    bin(range, category, records).into_iter().map(LedgerRecord::amount).sum()
}

/// Sum of [`bin_total`] over several categories, as used for a catalog
/// category whose subcategories are the record categories.
pub fn bin_total_all<'c>(
    range: DateRange,
    categories: impl IntoIterator<Item = &'c str>,
    records: &[LedgerRecord],
) -> Money {
    categories
        .into_iter()
        .map(|c| bin_total(range, c, records))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::DateFormat;
    use crate::record::RecordSource;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(cents: i64, d: NaiveDate, category: &str) -> LedgerRecord {
        LedgerRecord::new(Money::from_cents(cents), d, category, RecordSource::Cash)
    }

    #[test]
    fn bins_only_records_inside_range() {
        let records = vec![
            rec(5000, date(2024, 1, 5), "FOOD"),
            rec(2000, date(2024, 1, 20), "FOOD"),
        ];
        let range = DateRange::parse("01/01/24", "01/15/24", DateFormat::ShortYear).unwrap();
        let hits = bin(range, "FOOD", &records);
        assert_eq!(hits, vec![&records[0]]);
        assert_eq!(bin_total(range, "FOOD", &records), Money::from_cents(5000));
    }

    #[test]
    fn start_is_included_and_end_is_excluded() {
        let records = vec![
            rec(100, date(2024, 1, 1), "gas"),
            rec(200, date(2024, 1, 15), "gas"),
        ];
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 15));
        assert_eq!(bin(range, "gas", &records), vec![&records[0]]);
    }

    #[test]
    fn category_match_is_exact() {
        let records = vec![
            rec(100, date(2024, 1, 2), "dining"),
            rec(200, date(2024, 1, 2), "Dining"),
            rec(400, date(2024, 1, 2), "dining "),
        ];
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 15));
        assert_eq!(bin_total(range, "dining", &records), Money::from_cents(100));
    }

    #[test]
    fn empty_bin_totals_zero() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 15));
        assert!(bin_total(range, "FOOD", &[]).is_zero());
    }

    #[test]
    fn bin_is_exactly_the_matching_subset() {
        let range = DateRange::new(date(2024, 2, 1), date(2024, 2, 15));
        let records: Vec<LedgerRecord> = (0..40)
            .map(|i| {
                let cat = if i % 3 == 0 { "rent" } else { "fuel" };
                rec(i * 10, date(2024, 1, 20) + chrono::Duration::days(i), cat)
            })
            .collect();
        let expected: Vec<&LedgerRecord> = records
            .iter()
            .filter(|r| r.category() == "fuel" && r.date() >= range.start && r.date() < range.end)
            .collect();
        assert_eq!(bin(range, "fuel", &records), expected);
        assert_eq!(expected.len(), 9);
    }

    #[test]
    fn total_over_subcategories() {
        let records = vec![
            rec(30000, date(2024, 1, 3), "groceries"),
            rec(4500, date(2024, 1, 4), "dining"),
            rec(999, date(2024, 1, 4), "movies"),
        ];
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 15));
        assert_eq!(
            bin_total_all(range, ["groceries", "dining"], &records),
            Money::from_cents(34500)
        );
    }
}
