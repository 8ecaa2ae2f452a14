//! Declarative paystub field table.
//!
//! Each field is one record: name, pattern (capture group 1 is the value),
//! kind, and the aggregates it contributes to. Adding or retuning a field is a
//! change to [`STANDARD_FIELDS`], not to extraction code.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::Aggregate;

pub const HOURS_WORKED: &str = "Hours Worked";
pub const GROSS_PAY: &str = "Gross Pay";
pub const BONUS: &str = "Bonus";
pub const BEGINNING_DATE: &str = "Beginning Date";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Decimal amount.
    Amount,
    /// Kept verbatim.
    Text,
    /// Amount whose pattern also hits the year-to-date column. `broad`
    /// captures the whole numeric run starting at the same place; see
    /// [`crate::extract::disambiguate_award`].
    Award { broad: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub pattern: &'static str,
    pub kind: FieldKind,
    pub aggregates: &'static [Aggregate],
    pub ledger_category: Option<&'static str>,
}

impl FieldSpec {
    pub const fn amount(name: &'static str, pattern: &'static str, aggregates: &'static [Aggregate]) -> Self {
        FieldSpec {
            name,
            pattern,
            kind: FieldKind::Amount,
            aggregates,
            ledger_category: None,
        }
    }

    pub const fn income(self, category: &'static str) -> Self {
        FieldSpec {
            ledger_category: Some(category),
            ..self
        }
    }
}

use crate::types::Aggregate::{Deductions, Healthcare, Misc, Retirement, Tax};

pub const STANDARD_FIELDS: &[FieldSpec] = &[
    FieldSpec::amount(HOURS_WORKED, r"GROSS PAY \*\*\*\*(\d\d.\d\d)", &[]),
    // Assumes a seven character pay string.
    FieldSpec::amount(GROSS_PAY, r"GROSS PAY \*\*\*\*\d\d.\d\d(\d{4}.\d\d)", &[]).income("Gross Pay"),
    FieldSpec {
        name: BONUS,
        pattern: r"CASH AWARD(.{3,5}\.\d\d)",
        kind: FieldKind::Award {
            broad: r"CASH AWARD(.{3,5}\.\d\d[\d.,]*)",
        },
        aggregates: &[],
        ledger_category: Some("Bonus"),
    },
    FieldSpec::amount("Retirement Contribution", r"RETIREMENT(\d{3,5}\.\d\d)", &[Deductions, Retirement]),
    FieldSpec::amount("TSP Contribution", r"ROTH TSP-FERS(\d{3,5}\.\d\d)", &[Deductions, Retirement]),
    FieldSpec::amount("Social Security", r"SOCIAL SECURITY \(OASDI\)(\d{3,5}\.\d\d)", &[Deductions]),
    FieldSpec::amount("Federal Tax", r"FEDERAL TAX EXEMPTS S03(\d{3,5}\.\d\d)", &[Deductions, Tax]),
    FieldSpec::amount("State Tax", r"ST TAX \w\w   EXEMPTS 001(\d{3,5}\.\d\d)", &[Deductions, Tax]),
    FieldSpec::amount(
        "Health Insurance Premium",
        r"FEHBA - ENROLL CODE  \d\d\d(\d{2,3}\.\d\d)",
        &[Deductions, Healthcare],
    ),
    FieldSpec::amount("Vision Insurance Premium", r"VISION PLAN(\d{1,3}\.\d\d)", &[Deductions, Healthcare]),
    FieldSpec::amount("Misc", r"UNION.ASSOCIATION DUES \d\d \d\d\d\d(\d{1,3}\.\d\d)", &[Deductions, Misc]),
    FieldSpec::amount("Medicare", r"MEDICARE TAX WITHHELD(\d{2}\.\d\d)", &[Deductions, Tax]),
    FieldSpec::amount("Gym", r"DISCRETIONARY ALLOTMENT(\d{2}\.\d\d)", &[Deductions, Healthcare]),
    FieldSpec {
        name: BEGINNING_DATE,
        pattern: r"\*\*\*\*(\d\d/\d\d/\d\d\d\d)",
        kind: FieldKind::Text,
        aggregates: &[],
        ledger_category: None,
    },
];

/// A field spec with its patterns compiled. A pattern that fails to compile
/// is kept as an error so only that field comes out absent.
pub(crate) struct CompiledField {
    pub spec: FieldSpec,
    pub regex: Result<Regex, String>,
    pub broad: Option<Result<Regex, String>>,
}

pub struct PaystubSchema {
    pub(crate) fields: Vec<CompiledField>,
}

impl PaystubSchema {
    pub fn new(specs: &[FieldSpec]) -> Self {
        let compile = |p: &str| Regex::new(p).map_err(|e| e.to_string());
        let fields = specs
            .iter()
            .map(|spec| CompiledField {
                spec: *spec,
                regex: compile(spec.pattern),
                broad: match spec.kind {
                    FieldKind::Award { broad } => Some(compile(broad)),
                    _ => None,
                },
            })
            .collect();
        Self { fields }
    }

    pub fn standard() -> &'static PaystubSchema {
        static S: OnceLock<PaystubSchema> = OnceLock::new();
        S.get_or_init(|| PaystubSchema::new(STANDARD_FIELDS))
    }

    pub fn specs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().map(|f| &f.spec)
    }

    /// Names of the fields contributing to `aggregate`, in schema order.
    pub fn members(&self, aggregate: Aggregate) -> Vec<&'static str> {
        self.specs()
            .filter(|s| s.aggregates.contains(&aggregate))
            .map(|s| s.name)
            .collect()
    }
}
