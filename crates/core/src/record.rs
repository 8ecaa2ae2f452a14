use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

/// Where a ledger record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Cash,
    Credit,
    Other,
    Paystub,
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSource::Cash => write!(f, "cash"),
            RecordSource::Credit => write!(f, "credit"),
            RecordSource::Other => write!(f, "other"),
            RecordSource::Paystub => write!(f, "paystub"),
        }
    }
}

/// One expense or income event. Fields are private so a record cannot change
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    amount: Money,
    date: NaiveDate,
    category: String,
    source: RecordSource,
}

impl LedgerRecord {
    pub fn new(amount: Money, date: NaiveDate, category: impl Into<String>, source: RecordSource) -> Self {
        LedgerRecord {
            amount,
            date,
            category: category.into(),
            source,
        }
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn source(&self) -> RecordSource {
        self.source
    }
}

impl fmt::Display for LedgerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.amount, self.date, self.category)
    }
}
