use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use tally_core::{DateFormat, Issue, LedgerRecord, Money, RecordSource};

/// Derived totals computed from several paystub fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Aggregate {
    Deductions,
    Healthcare,
    Retirement,
    Tax,
    Misc,
}

impl Aggregate {
    pub const ALL: [Aggregate; 5] = [
        Aggregate::Deductions,
        Aggregate::Healthcare,
        Aggregate::Retirement,
        Aggregate::Tax,
        Aggregate::Misc,
    ];

    /// Ledger category an expense record for this aggregate is filed under.
    /// `Deductions` is the grand total of the others and gets none.
    pub fn ledger_category(self) -> Option<&'static str> {
        match self {
            Aggregate::Deductions => None,
            Aggregate::Healthcare => Some("Healthcare"),
            Aggregate::Retirement => Some("Retirement"),
            Aggregate::Tax => Some("Tax"),
            Aggregate::Misc => Some("Dues"),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Deductions => write!(f, "Deductions"),
            Aggregate::Healthcare => write!(f, "Healthcare"),
            Aggregate::Retirement => write!(f, "Retirement"),
            Aggregate::Tax => write!(f, "Tax"),
            Aggregate::Misc => write!(f, "Misc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Amount(Decimal),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Absence {
    /// The field's pattern matched nothing.
    NotFound,
    /// Matched text that could not be coerced to the field's kind, or a
    /// pattern that could not be compiled.
    Malformed(String),
    /// The document itself could not be read.
    Unreadable(String),
}

impl fmt::Display for Absence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Absence::NotFound => write!(f, "no value found"),
            Absence::Malformed(why) => write!(f, "malformed value: {why}"),
            Absence::Unreadable(why) => write!(f, "document unreadable: {why}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOutcome {
    Found(FieldValue),
    Absent(Absence),
}

impl FieldOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, FieldOutcome::Found(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub name: String,
    pub outcome: FieldOutcome,
    /// Ledger category for an income record carrying this field's amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_category: Option<String>,
}

/// An aggregate is a closed sum: one absent summand leaves it unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOutcome {
    Resolved(Decimal),
    Unresolved { missing: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPaystub {
    pub document: String,
    pub fields: Vec<ExtractedField>,
    pub aggregates: Vec<(Aggregate, AggregateOutcome)>,
    pub issues: Vec<Issue>,
}

impl ExtractedPaystub {
    pub fn field(&self, name: &str) -> Option<&FieldOutcome> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.outcome)
    }

    pub fn amount(&self, name: &str) -> Option<Decimal> {
        match self.field(name)? {
            FieldOutcome::Found(FieldValue::Amount(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.field(name)? {
            FieldOutcome::Found(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn aggregate(&self, aggregate: Aggregate) -> Option<&AggregateOutcome> {
        self.aggregates
            .iter()
            .find(|(a, _)| *a == aggregate)
            .map(|(_, o)| o)
    }

    pub fn resolved(&self, aggregate: Aggregate) -> Option<Decimal> {
        match self.aggregate(aggregate)? {
            AggregateOutcome::Resolved(n) => Some(*n),
            AggregateOutcome::Unresolved { .. } => None,
        }
    }

    /// The pay-period start token, parsed. The token itself stays available
    /// as text through [`ExtractedPaystub::text`].
    pub fn begin_date(&self) -> Option<NaiveDate> {
        self.text(crate::schema::BEGINNING_DATE)
            .and_then(|s| DateFormat::LongYear.parse(s).ok())
    }

    /// Income records for fields with a ledger category and expense records
    /// for resolved aggregates with one, all dated `pay_date`.
    pub fn ledger_records(&self, pay_date: NaiveDate) -> Vec<LedgerRecord> {
        let income = self.fields.iter().filter_map(|f| {
            let category = f.ledger_category.as_deref()?;
            match &f.outcome {
                FieldOutcome::Found(FieldValue::Amount(n)) => Some(LedgerRecord::new(
                    Money::from_decimal(*n),
                    pay_date,
                    category,
                    RecordSource::Paystub,
                )),
                _ => None,
            }
        });
        let expenses = self.aggregates.iter().filter_map(|(agg, outcome)| {
            let category = agg.ledger_category()?;
            match outcome {
                AggregateOutcome::Resolved(n) => Some(LedgerRecord::new(
                    Money::from_decimal(*n),
                    pay_date,
                    category,
                    RecordSource::Paystub,
                )),
                AggregateOutcome::Unresolved { .. } => None,
            }
        });
        income.chain(expenses).collect()
    }
}
