use serde::{Deserialize, Serialize};
use std::fmt;

use super::period::DateRange;

/// Recoverable conditions. Each is local to one field, source row, or header
/// and never aborts the surrounding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A pattern or cell found nothing.
    ParseAbsence,
    /// A value was found but could not be coerced.
    MalformedInput,
    /// A header names a category missing from the catalog.
    UnknownCategory,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::ParseAbsence => write!(f, "parse_absence"),
            IssueKind::MalformedInput => write!(f, "malformed_input"),
            IssueKind::UnknownCategory => write!(f, "unknown_category"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// What the issue is about: a field name, a source, a header.
    pub subject: String,
    pub detail: String,
}

impl Issue {
    pub fn new(kind: IssueKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Issue {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.detail)
    }
}

/// Everything a run produced besides the store mutations themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub periods_created: Vec<DateRange>,
    pub issues: Vec<Issue>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_display() {
        let issue = Issue::new(IssueKind::UnknownCategory, "[TRAVEL] row 14", "not in catalog");
        assert_eq!(issue.to_string(), "[unknown_category] [TRAVEL] row 14: not in catalog");
    }

    #[test]
    fn report_counts_by_kind() {
        let mut report = RunReport::new();
        assert!(report.is_clean());
        report.push(Issue::new(IssueKind::ParseAbsence, "Gym", "no match"));
        report.extend([
            Issue::new(IssueKind::ParseAbsence, "Misc", "no match"),
            Issue::new(IssueKind::MalformedInput, "credit", "bad date"),
        ]);
        assert_eq!(report.count(IssueKind::ParseAbsence), 2);
        assert_eq!(report.count(IssueKind::MalformedInput), 1);
        assert_eq!(report.count(IssueKind::UnknownCategory), 0);
    }
}
