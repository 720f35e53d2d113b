//! Per-invocation report model.

use serde::Serialize;

use crate::extract::ExtractionWarning;
use crate::outcome::{Outcome, Verdict};
use crate::snippet::{CompileMode, Snippet, SnippetId};

/// One report line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub id: SnippetId,
    pub mode: CompileMode,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ReportEntry {
    pub fn new(snippet: &Snippet, verdict: Verdict) -> Self {
        Self {
            id: snippet.id.clone(),
            mode: snippet.mode,
            outcome: verdict.outcome,
            diff: verdict.diff,
            note: verdict.note,
        }
    }
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub unverifiable: usize,
    pub expected_errors: usize,
    pub divergent: usize,
    pub skipped: usize,
    pub warnings: usize,
}

impl Summary {
    /// Human summary such as `3 passed, 1 failed, 2 unverifiable`.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = [
            (self.passed, "passed"),
            (self.failed, "failed"),
            (self.unverifiable, "unverifiable"),
            (self.expected_errors, "xfailed"),
            (self.divergent, "terminated"),
            (self.skipped, "skipped"),
            (self.warnings, "warnings"),
        ]
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect();

        if parts.is_empty() {
            "no snippets".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Aggregate of per-snippet outcomes for one invocation, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Report {
    pub entries: Vec<ReportEntry>,
    pub warnings: Vec<ExtractionWarning>,
}

impl Report {
    pub fn new(warnings: Vec<ExtractionWarning>) -> Self {
        Self {
            entries: Vec::new(),
            warnings,
        }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    /// Restore document order (file, then fence line).
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.id.cmp(&b.id));
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.entries.len(),
            warnings: self.warnings.len(),
            ..Summary::default()
        };
        for entry in &self.entries {
            match entry.outcome {
                Outcome::Pass => summary.passed += 1,
                Outcome::Fail(_) => summary.failed += 1,
                Outcome::Unverifiable => summary.unverifiable += 1,
                Outcome::ExpectedCompileError => summary.expected_errors += 1,
                Outcome::TerminatedDivergent => summary.divergent += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// All verifiable snippets passed. Drives the process exit code.
    pub fn is_success(&self) -> bool {
        !self.entries.iter().any(|e| e.outcome.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;

    fn entry(file: &str, line: usize, outcome: Outcome) -> ReportEntry {
        ReportEntry {
            id: SnippetId::new(file, line, 0),
            mode: CompileMode::Loose,
            outcome,
            diff: None,
            note: None,
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut report = Report::default();
        report.push(entry("a.md", 1, Outcome::Pass));
        report.push(entry("a.md", 5, Outcome::Pass));
        report.push(entry("a.md", 9, Outcome::Fail(FailureKind::Timeout)));
        report.push(entry("a.md", 12, Outcome::Unverifiable));
        report.push(entry("b.md", 1, Outcome::ExpectedCompileError));
        let summary = report.summary();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unverifiable, 1);
        assert_eq!(summary.expected_errors, 1);
        assert_eq!(summary.describe(), "2 passed, 1 failed, 1 unverifiable, 1 xfailed");
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_unverifiable_and_skipped_do_not_fail() {
        let mut report = Report::default();
        report.push(entry("a.md", 1, Outcome::Unverifiable));
        report.push(entry("a.md", 2, Outcome::Skipped));
        report.push(entry("a.md", 3, Outcome::TerminatedDivergent));
        assert!(report.is_success());
    }

    #[test]
    fn test_empty_report() {
        let report = Report::default();
        assert!(report.is_success());
        assert_eq!(report.summary().describe(), "no snippets");
    }

    #[test]
    fn test_sort_restores_document_order() {
        let mut report = Report::default();
        report.push(entry("b.md", 1, Outcome::Pass));
        report.push(entry("a.md", 20, Outcome::Pass));
        report.push(entry("a.md", 3, Outcome::Pass));
        report.sort();
        let ids: Vec<String> = report.entries.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["a.md:3", "a.md:20", "b.md:1"]);
    }
}
