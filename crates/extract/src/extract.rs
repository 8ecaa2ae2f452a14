use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use tally_core::{Issue, IssueKind};

use crate::schema::{CompiledField, FieldKind, PaystubSchema};
use crate::types::{
    Absence, Aggregate, AggregateOutcome, ExtractedField, ExtractedPaystub, FieldOutcome, FieldValue,
};

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Extract every field of the standard paystub schema from `text`.
    pub fn extract(document: &str, text: &str) -> ExtractedPaystub {
        Self::extract_with(PaystubSchema::standard(), document, text)
    }

    /// Extract every field of `schema`. A field that cannot be found or
    /// coerced comes out absent and is reported; the other fields are
    /// unaffected.
    pub fn extract_with(schema: &PaystubSchema, document: &str, text: &str) -> ExtractedPaystub {
        let mut issues = Vec::new();

        let fields: Vec<ExtractedField> = schema
            .fields
            .iter()
            .map(|field| {
                let outcome = extract_field(field, text);
                if let FieldOutcome::Absent(absence) = &outcome {
                    issues.push(absence_issue(field.spec.name, document, absence));
                }
                ExtractedField {
                    name: field.spec.name.to_string(),
                    outcome,
                    ledger_category: field.spec.ledger_category.map(str::to_string),
                }
            })
            .collect();

        let aggregates = resolve_aggregates(schema, &fields, document, &mut issues);

        ExtractedPaystub {
            document: document.to_string(),
            fields,
            aggregates,
            issues,
        }
    }

    /// Every field absent: the document could not be obtained or decoded.
    pub fn unreadable(document: &str, reason: &str) -> ExtractedPaystub {
        Self::unreadable_with(PaystubSchema::standard(), document, reason)
    }

    pub fn unreadable_with(schema: &PaystubSchema, document: &str, reason: &str) -> ExtractedPaystub {
        tracing::warn!("Could not read paystub {document}: {reason}");
        let absence = Absence::Unreadable(reason.to_string());
        let fields: Vec<ExtractedField> = schema
            .specs()
            .map(|spec| ExtractedField {
                name: spec.name.to_string(),
                outcome: FieldOutcome::Absent(absence.clone()),
                ledger_category: spec.ledger_category.map(str::to_string),
            })
            .collect();
        let mut issues = vec![Issue::new(IssueKind::ParseAbsence, document, absence.to_string())];
        let aggregates = resolve_aggregates(schema, &fields, document, &mut issues);
        ExtractedPaystub {
            document: document.to_string(),
            fields,
            aggregates,
            issues,
        }
    }
}

// ── Fields ────────────────────────────────────────────────────────────────────

fn extract_field(field: &CompiledField, text: &str) -> FieldOutcome {
    let re = match &field.regex {
        Ok(re) => re,
        Err(e) => return FieldOutcome::Absent(Absence::Malformed(format!("invalid pattern: {e}"))),
    };
    let Some(matched) = first_capture(re, text) else {
        return FieldOutcome::Absent(Absence::NotFound);
    };

    let value = match field.spec.kind {
        FieldKind::Text => return FieldOutcome::Found(FieldValue::Text(matched.to_string())),
        FieldKind::Amount => parse_amount(matched),
        FieldKind::Award { .. } => {
            let broad = field
                .broad
                .as_ref()
                .and_then(|b| b.as_ref().ok())
                .and_then(|re| first_capture(re, text));
            match broad {
                Some(broad) => disambiguate_award(matched, broad),
                None => parse_amount(matched),
            }
        }
    };

    match value {
        Some(n) => FieldOutcome::Found(FieldValue::Amount(n)),
        None => FieldOutcome::Absent(Absence::Malformed(format!("'{matched}' is not an amount"))),
    }
}

fn first_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    let caps = re.captures(text)?;
    caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
}

/// Award lines print the current award and the year-to-date total side by
/// side, and the narrow pattern cannot tell a lone year-to-date figure from a
/// new award. When the broad match (the numeric run continuing past the
/// narrow match) is no more than one character longer, the narrow match is
/// the year-to-date carry-over and this period's award is zero. Otherwise the
/// narrow match is the award.
///
/// Approximate: a current award immediately followed by a one-digit
/// year-to-date column would be read as zero.
pub fn disambiguate_award(narrow: &str, broad: &str) -> Option<Decimal> {
    if narrow.chars().count().abs_diff(broad.chars().count()) <= 1 {
        Some(Decimal::ZERO)
    } else {
        parse_amount(narrow)
    }
}

fn parse_amount(s: &str) -> Option<Decimal> {
    let clean: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    Decimal::from_str(&clean).ok()
}

fn absence_issue(field: &str, document: &str, absence: &Absence) -> Issue {
    let kind = match absence {
        Absence::Malformed(_) => IssueKind::MalformedInput,
        Absence::NotFound | Absence::Unreadable(_) => IssueKind::ParseAbsence,
    };
    tracing::warn!("{absence} for {field} while parsing {document}");
    Issue::new(kind, field, format!("{absence} in {document}"))
}

// ── Aggregates ────────────────────────────────────────────────────────────────

fn resolve_aggregates(
    schema: &PaystubSchema,
    fields: &[ExtractedField],
    document: &str,
    issues: &mut Vec<Issue>,
) -> Vec<(Aggregate, AggregateOutcome)> {
    Aggregate::ALL
        .iter()
        .filter_map(|&aggregate| {
            let members = schema.members(aggregate);
            if members.is_empty() {
                return None;
            }

            let mut total = Decimal::ZERO;
            let mut missing = Vec::new();
            for name in members {
                match fields.iter().find(|f| f.name == name).map(|f| &f.outcome) {
                    Some(FieldOutcome::Found(FieldValue::Amount(n))) => total += *n,
                    _ => missing.push(name.to_string()),
                }
            }

            let outcome = if missing.is_empty() {
                AggregateOutcome::Resolved(total)
            } else {
                let list = missing.join(", ");
                tracing::warn!("{aggregate} unresolved for {document}; missing {list}");
                issues.push(Issue::new(
                    IssueKind::ParseAbsence,
                    aggregate.to_string(),
                    format!("unresolved in {document}; missing {list}"),
                ));
                AggregateOutcome::Unresolved { missing }
            };
            Some((aggregate, outcome))
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, BEGINNING_DATE, BONUS, GROSS_PAY, HOURS_WORKED};
    use chrono::NaiveDate;

    const STUB: &str = "\
EARNINGS STATEMENT
GROSS PAY ****80.003100.00
CASH AWARD250.00750.00
RETIREMENT155.00
ROTH TSP-FERS310.00
SOCIAL SECURITY (OASDI)192.20
FEDERAL TAX EXEMPTS S03412.35
ST TAX MD   EXEMPTS 001150.10
FEHBA - ENROLL CODE  105120.50
VISION PLAN12.34
UNION/ASSOCIATION DUES 01 202418.00
MEDICARE TAX WITHHELD44.95
DISCRETIONARY ALLOTMENT25.00
PAY PERIOD BEGINNING ****01/07/2024
";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ── Fields ────────────────────────────────────────────────────────────────

    #[test]
    fn extracts_every_standard_field() {
        let r = Extractor::extract("NFC_Paystub_2024_02_01", STUB);
        assert_eq!(r.amount(HOURS_WORKED), Some(dec("80.00")));
        assert_eq!(r.amount(GROSS_PAY), Some(dec("3100.00")));
        assert_eq!(r.amount("Retirement Contribution"), Some(dec("155.00")));
        assert_eq!(r.amount("State Tax"), Some(dec("150.10")));
        assert_eq!(r.amount("Health Insurance Premium"), Some(dec("120.50")));
        assert_eq!(r.amount("Misc"), Some(dec("18.00")));
        assert_eq!(r.amount("Gym"), Some(dec("25.00")));
        assert_eq!(r.text(BEGINNING_DATE), Some("01/07/2024"));
        assert_eq!(r.begin_date(), NaiveDate::from_ymd_opt(2024, 1, 7));
        assert!(r.issues.is_empty(), "{:?}", r.issues);
    }

    #[test]
    fn aggregates_are_closed_sums() {
        let r = Extractor::extract("stub", STUB);
        assert_eq!(r.resolved(Aggregate::Deductions), Some(dec("1440.44")));
        assert_eq!(r.resolved(Aggregate::Healthcare), Some(dec("157.84")));
        assert_eq!(r.resolved(Aggregate::Retirement), Some(dec("465.00")));
        assert_eq!(r.resolved(Aggregate::Tax), Some(dec("607.40")));
        assert_eq!(r.resolved(Aggregate::Misc), Some(dec("18.00")));
    }

    #[test]
    fn missing_retirement_leaves_deductions_unresolved() {
        let text = STUB.replace("RETIREMENT155.00\n", "");
        let r = Extractor::extract("NFC_Paystub_2024_02_01", &text);

        assert_eq!(
            r.field("Retirement Contribution"),
            Some(&FieldOutcome::Absent(Absence::NotFound))
        );
        assert_eq!(
            r.aggregate(Aggregate::Deductions),
            Some(&AggregateOutcome::Unresolved {
                missing: vec!["Retirement Contribution".to_string()]
            })
        );
        assert_eq!(r.resolved(Aggregate::Retirement), None);
        // Other fields and aggregates are unaffected.
        assert_eq!(r.resolved(Aggregate::Tax), Some(dec("607.40")));
        assert_eq!(r.amount("TSP Contribution"), Some(dec("310.00")));
    }

    #[test]
    fn absence_is_reported_with_field_and_document() {
        let text = STUB.replace("VISION PLAN12.34\n", "");
        let r = Extractor::extract("NFC_Paystub_2024_02_01", &text);
        let issue = r
            .issues
            .iter()
            .find(|i| i.subject == "Vision Insurance Premium")
            .unwrap();
        assert_eq!(issue.kind, IssueKind::ParseAbsence);
        assert!(issue.detail.contains("NFC_Paystub_2024_02_01"));
        assert!(r.issues.iter().any(|i| i.subject == "Healthcare"));
        assert!(r.issues.iter().any(|i| i.subject == "Deductions"));
    }

    #[test]
    fn malformed_match_is_absent_not_fatal() {
        // `.` in the hours pattern accepts any character.
        let text = STUB.replace("****80.00", "****80x00");
        let r = Extractor::extract("stub", &text);
        assert!(matches!(
            r.field(HOURS_WORKED),
            Some(FieldOutcome::Absent(Absence::Malformed(_)))
        ));
        assert_eq!(r.amount(GROSS_PAY), Some(dec("3100.00")));
        assert_eq!(
            r.issues.iter().find(|i| i.subject == HOURS_WORKED).map(|i| i.kind),
            Some(IssueKind::MalformedInput)
        );
    }

    #[test]
    fn invalid_pattern_only_affects_its_field() {
        let specs = [
            FieldSpec::amount("Broken", r"(unclosed", &[]),
            FieldSpec::amount("Medicare", r"MEDICARE TAX WITHHELD(\d{2}\.\d\d)", &[]),
        ];
        let schema = PaystubSchema::new(&specs);
        let r = Extractor::extract_with(&schema, "stub", STUB);
        assert!(matches!(r.field("Broken"), Some(FieldOutcome::Absent(Absence::Malformed(_)))));
        assert_eq!(r.amount("Medicare"), Some(dec("44.95")));
        assert!(r.aggregates.is_empty());
    }

    #[test]
    fn empty_text_yields_all_absent() {
        let r = Extractor::extract("stub", "");
        assert!(r.fields.iter().all(|f| !f.outcome.is_found()));
        assert!(r
            .aggregates
            .iter()
            .all(|(_, o)| matches!(o, AggregateOutcome::Unresolved { .. })));
    }

    #[test]
    fn unreadable_document_marks_every_field() {
        let r = Extractor::unreadable("NFC_Paystub_2024_02_01", "file not found");
        assert!(r
            .fields
            .iter()
            .all(|f| matches!(f.outcome, FieldOutcome::Absent(Absence::Unreadable(_)))));
        assert_eq!(r.issues[0].subject, "NFC_Paystub_2024_02_01");
    }

    #[test]
    fn no_panic_on_garbage_input() {
        let _ = Extractor::extract("stub", "!@#$%^&*()\n\0\x01\x02 CASH AWARD");
    }

    // ── Award disambiguation ─────────────────────────────────────────────────

    #[test]
    fn award_with_longer_run_is_the_narrow_value() {
        assert_eq!(disambiguate_award("2.50", "502.50"), Some(dec("2.50")));
    }

    #[test]
    fn award_within_one_character_is_zero() {
        assert_eq!(disambiguate_award("2.50", "12.50"), Some(Decimal::ZERO));
        assert_eq!(disambiguate_award("250.00", "250.00"), Some(Decimal::ZERO));
    }

    #[test]
    fn current_award_is_extracted() {
        let r = Extractor::extract("stub", STUB);
        assert_eq!(r.amount(BONUS), Some(dec("250.00")));
    }

    #[test]
    fn year_to_date_only_award_is_zero() {
        let text = STUB.replace("CASH AWARD250.00750.00", "CASH AWARD750.00");
        let r = Extractor::extract("stub", &text);
        assert_eq!(r.amount(BONUS), Some(Decimal::ZERO));
    }

    #[test]
    fn no_award_line_is_absent() {
        let text = STUB.replace("CASH AWARD250.00750.00\n", "");
        let r = Extractor::extract("stub", &text);
        assert_eq!(r.field(BONUS), Some(&FieldOutcome::Absent(Absence::NotFound)));
    }

    // ── amount parsing ────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_tolerates_padding_and_commas() {
        assert_eq!(parse_amount(" 1,250.00"), Some(dec("1250.00")));
        assert_eq!(parse_amount("12.5x"), None);
    }
}
