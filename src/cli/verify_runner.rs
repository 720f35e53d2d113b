//! Snippet verification runner (pytest-style output)
//!
//! ## VerifyReporter Trait
//!
//! Reporting is separated from execution by the `VerifyReporter` trait. The console reporter
//! prints one line per snippet plus a failure section; the JSON reporter prints the whole report
//! once at the end.
//!
//! ## Ordering
//!
//! Snippets run sequentially by default. With more than one job they are spread over scoped
//! worker threads and the entries are put back into document order before anything is reported.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use miette::Diagnostic;
use snipcheck_core::{
    ExecutionResult, ExtractOptions, ExtractionWarning, Outcome, Policy, Report, ReportEntry, Snippet, classify,
    extract,
};

use super::verify_interfaces::SnippetExecutor;

// ============================================================================
// Reporter Trait
// ============================================================================

/// Trait for reporting verification progress and results.
pub trait VerifyReporter {
    /// Called once extraction is done, before anything runs.
    fn on_collection_complete(&mut self, snippet_count: usize, warnings: &[ExtractionWarning]);

    /// Called before a snippet runs (sequential mode only).
    fn on_snippet_start(&mut self, _snippet: &Snippet) {}

    /// Called for every snippet, in document order.
    fn on_snippet_complete(&mut self, entry: &ReportEntry);

    /// Called when all snippets have completed.
    fn on_run_complete(&mut self, report: &Report, elapsed: Duration);
}

/// Default console reporter.
pub struct ConsoleReporter<W: Write> {
    out: W,
    verbose: bool,
    color: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool, color: bool) -> Self {
        Self { out, verbose, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn status(&self, outcome: &Outcome) -> String {
        let code = match outcome {
            Outcome::Pass => "32",
            Outcome::Fail(_) => "31",
            _ => "33",
        };
        self.paint(&outcome.to_string(), code)
    }
}

impl<W: Write> VerifyReporter for ConsoleReporter<W> {
    fn on_collection_complete(&mut self, snippet_count: usize, warnings: &[ExtractionWarning]) {
        let header = self.paint("=================== snipcheck session starts ===================", "1");
        let _ = writeln!(self.out, "{header}");
        let _ = writeln!(self.out, "collected {snippet_count} snippet(s)");
        for warning in warnings {
            let label = self.paint("warning", "33");
            let _ = writeln!(self.out, "{label}: {warning}");
            if self.verbose {
                if let Some(help) = warning.help() {
                    let _ = writeln!(self.out, "  help: {help}");
                }
            }
        }
        let _ = writeln!(self.out);
    }

    fn on_snippet_complete(&mut self, entry: &ReportEntry) {
        let status = self.status(&entry.outcome);
        if self.verbose {
            let _ = writeln!(self.out, "{} [{}] {}", entry.id, entry.mode, status);
            if !entry.outcome.is_failure() {
                if let Some(note) = &entry.note {
                    for line in note.lines() {
                        let _ = writeln!(self.out, "    {line}");
                    }
                }
            }
        } else {
            let _ = writeln!(self.out, "{} {}", entry.id, status);
        }
    }

    fn on_run_complete(&mut self, report: &Report, elapsed: Duration) {
        let failures: Vec<&ReportEntry> = report.failures().collect();
        if !failures.is_empty() {
            let _ = writeln!(self.out);
            let title = self.paint("=================== FAILURES ===================", "1;31");
            let _ = writeln!(self.out, "{title}");
            for entry in failures {
                let _ = writeln!(self.out);
                let _ = writeln!(self.out, "___________ {} ___________", entry.id);
                let _ = writeln!(self.out, "{}", entry.outcome);
                for detail in [&entry.diff, &entry.note].into_iter().flatten() {
                    for line in detail.lines() {
                        let _ = writeln!(self.out, "    {line}");
                    }
                }
            }
        }

        let _ = writeln!(self.out);
        let code = if report.is_success() { "1;32" } else { "1;31" };
        let summary = format!(
            "=================== {} in {:.2}s ===================",
            report.summary().describe(),
            elapsed.as_secs_f64()
        );
        let summary = self.paint(&summary, code);
        let _ = writeln!(self.out, "{summary}");
    }
}

/// Machine-readable reporter: one JSON document at the end of the run.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> VerifyReporter for JsonReporter<W> {
    fn on_collection_complete(&mut self, _snippet_count: usize, _warnings: &[ExtractionWarning]) {}

    fn on_snippet_complete(&mut self, _entry: &ReportEntry) {}

    fn on_run_complete(&mut self, report: &Report, _elapsed: Duration) {
        let doc = serde_json::json!({
            "success": report.is_success(),
            "summary": report.summary(),
            "entries": &report.entries,
            "warnings": &report.warnings,
        });
        match serde_json::to_string_pretty(&doc) {
            Ok(text) => {
                let _ = writeln!(self.out, "{text}");
            }
            Err(err) => tracing::error!("failed to serialize report: {err}"),
        }
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Snippets and warnings gathered from a set of documents.
#[derive(Debug, Default)]
pub struct Collection {
    pub snippets: Vec<Snippet>,
    pub warnings: Vec<ExtractionWarning>,
}

/// Extract snippets from every document, in file order.
///
/// Unreadable documents become warnings; they never stop collection.
pub fn collect_snippets<F>(files: &[PathBuf], options: &ExtractOptions, read: F) -> Collection
where
    F: Fn(&Path) -> Result<String, String>,
{
    let mut collection = Collection::default();
    for file in files {
        match read(file) {
            Ok(source) => {
                let extraction = extract(file, &source, options);
                collection.snippets.extend(extraction.snippets);
                collection.warnings.extend(extraction.warnings);
            }
            Err(reason) => {
                tracing::warn!(file = %file.display(), "skipping unreadable document");
                collection.warnings.push(ExtractionWarning::Unreadable {
                    file: file.clone(),
                    reason,
                });
            }
        }
    }
    collection
}

/// Keep the snippets whose identifier or language contains `keyword`.
pub fn filter_snippets(snippets: Vec<Snippet>, keyword: Option<&str>) -> Vec<Snippet> {
    match keyword {
        Some(keyword) => snippets
            .into_iter()
            .filter(|s| s.filter_key().contains(keyword))
            .collect(),
        None => snippets,
    }
}

// ============================================================================
// Execution
// ============================================================================

/// How a verification run is carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub jobs: usize,
    pub stop_on_fail: bool,
    pub policy: Policy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            jobs: 1,
            stop_on_fail: false,
            policy: Policy::default(),
        }
    }
}

/// Verify every snippet and build the report.
///
/// `stop_on_fail` forces sequential execution so "first failure" means first in document order.
pub fn run_snippets(
    snippets: &[Snippet],
    warnings: Vec<ExtractionWarning>,
    executor: &dyn SnippetExecutor,
    settings: &RunSettings,
    reporter: &mut dyn VerifyReporter,
) -> Report {
    let start = std::time::Instant::now();
    reporter.on_collection_complete(snippets.len(), &warnings);
    let mut report = Report::new(warnings);

    if settings.jobs <= 1 || settings.stop_on_fail || snippets.len() <= 1 {
        for snippet in snippets {
            reporter.on_snippet_start(snippet);
            let entry = verify_snippet(snippet, executor, settings.policy);
            reporter.on_snippet_complete(&entry);
            let failed = entry.outcome.is_failure();
            report.push(entry);
            if failed && settings.stop_on_fail {
                tracing::debug!("stopping after first failure");
                break;
            }
        }
    } else {
        let mut entries = run_parallel(snippets, executor, settings);
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        for entry in entries {
            reporter.on_snippet_complete(&entry);
            report.push(entry);
        }
    }

    reporter.on_run_complete(&report, start.elapsed());
    report
}

/// Execute and classify one snippet.
pub fn verify_snippet(snippet: &Snippet, executor: &dyn SnippetExecutor, policy: Policy) -> ReportEntry {
    let result = if snippet.flags.skip {
        None
    } else {
        Some(executor.execute(snippet).unwrap_or_else(|err| {
            tracing::warn!(snippet = %snippet.id, "toolchain error: {err}");
            ExecutionResult::with_toolchain_error(snippet.id.clone(), err.to_string())
        }))
    };
    ReportEntry::new(snippet, classify(snippet, result.as_ref(), policy))
}

fn run_parallel(snippets: &[Snippet], executor: &dyn SnippetExecutor, settings: &RunSettings) -> Vec<ReportEntry> {
    let cursor = AtomicUsize::new(0);
    let cursor = &cursor;
    let policy = settings.policy;
    let workers = settings.jobs.min(snippets.len()).max(1);
    tracing::debug!(workers, "running snippets in parallel");

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let next = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(snippet) = snippets.get(next) else {
                            break;
                        };
                        done.push(verify_snippet(snippet, executor, policy));
                    }
                    done
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}
