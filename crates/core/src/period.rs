use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("Malformed date '{value}', expected {expected}")]
    Malformed { value: String, expected: &'static str },
}

/// Textual date layouts used by the ledger's sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `MM/DD/YY`
    #[default]
    ShortYear,
    /// `MM/DD/YYYY`
    LongYear,
}

impl DateFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            DateFormat::ShortYear => "%m/%d/%y",
            DateFormat::LongYear => "%m/%d/%Y",
        }
    }

    fn label(self) -> &'static str {
        match self {
            DateFormat::ShortYear => "MM/DD/YY",
            DateFormat::LongYear => "MM/DD/YYYY",
        }
    }

    pub fn parse(self, s: &str) -> Result<NaiveDate, DateError> {
        let s = s.trim();
        // chrono's %Y happily takes two digits, which would land in year 24 AD.
        let year_digits = s.rsplit('/').next().map(str::len).unwrap_or(0);
        let year_ok = match self {
            DateFormat::ShortYear => year_digits == 2,
            DateFormat::LongYear => year_digits == 4,
        };
        if !year_ok {
            return Err(self.malformed(s));
        }
        NaiveDate::parse_from_str(s, self.pattern()).map_err(|_| self.malformed(s))
    }

    pub fn format(self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }

    fn malformed(self, s: &str) -> DateError {
        DateError::Malformed {
            value: s.to_string(),
            expected: self.label(),
        }
    }
}

/// Half-open date interval: `start` is included, `end` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn parse(start: &str, end: &str, format: DateFormat) -> Result<Self, DateError> {
        Ok(DateRange::new(format.parse(start)?, format.parse(end)?))
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Fixed period length, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    days: u32,
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence { days: 14 }
    }
}

impl Cadence {
    pub fn new(days: u32) -> Option<Self> {
        (days > 0).then_some(Cadence { days })
    }

    pub fn days(self) -> u32 {
        self.days
    }

    pub fn next_end(self, end: NaiveDate) -> NaiveDate {
        end + Duration::days(i64::from(self.days))
    }

    /// Number of complete periods that have elapsed since `latest_end`:
    /// `floor((today - latest_end) / days)`. A period still in progress is
    /// not due, so this is zero until `latest_end + days <= today`.
    pub fn periods_due(self, latest_end: NaiveDate, today: NaiveDate) -> u64 {
        let behind = (today - latest_end).num_days();
        if behind <= 0 {
            return 0;
        }
        behind as u64 / u64::from(self.days)
    }
}
