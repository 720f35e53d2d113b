//! Property-based tests for the verification runner
//!
//! These use proptest to check that scheduling never changes what is reported: any number of
//! jobs gives the same report, in document order, with every snippet accounted for.

use std::path::{Path, PathBuf};

use proptest::prelude::*;
use snipcheck::ExecError;
use snipcheck::cli::verify_interfaces::SnippetExecutor;
use snipcheck::cli::verify_runner::{JsonReporter, RunSettings, collect_snippets, filter_snippets, run_snippets};
use snipcheck_core::{ExecutionResult, ExtractOptions, FailureKind, Outcome, Snippet};

/// Echoes the `console.log("...")` literal, except in snippets marked `broken`.
struct EchoExecutor;

impl SnippetExecutor for EchoExecutor {
    fn execute(&self, snippet: &Snippet) -> Result<ExecutionResult, ExecError> {
        let mut result = ExecutionResult::new(snippet.id.clone());
        result.ran = true;
        result.output = if snippet.body.contains("broken") {
            vec!["unexpected".to_string()]
        } else {
            snippet
                .body
                .lines()
                .filter_map(|l| l.split('"').nth(1))
                .map(str::to_string)
                .collect()
        };
        Ok(result)
    }
}

/// One block per flag; `true` marks a snippet whose output will not match.
fn document(broken: &[bool]) -> String {
    let mut doc = String::from("# Generated\n\n");
    for (i, is_broken) in broken.iter().enumerate() {
        let marker = if *is_broken { " // broken" } else { "" };
        doc.push_str(&format!("```ts\nconsole.log(\"line {i}\"); // Output: line {i}\n{marker}\n```\n\n"));
    }
    doc
}

fn snippets(broken: &[bool]) -> Vec<Snippet> {
    let source = document(broken);
    let files = vec![PathBuf::from("docs/generated.md")];
    collect_snippets(&files, &ExtractOptions::default(), |_: &Path| Ok(source.clone())).snippets
}

fn settings(jobs: usize) -> RunSettings {
    RunSettings {
        jobs,
        ..RunSettings::default()
    }
}

// =============================================================================
// Runner Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: the report does not depend on the number of jobs.
    #[test]
    fn report_is_independent_of_jobs(broken in prop::collection::vec(any::<bool>(), 0..12), jobs in 2usize..8) {
        let snippets = snippets(&broken);
        let sequential = run_snippets(&snippets, Vec::new(), &EchoExecutor, &settings(1), &mut JsonReporter::new(Vec::new()));
        let parallel = run_snippets(&snippets, Vec::new(), &EchoExecutor, &settings(jobs), &mut JsonReporter::new(Vec::new()));
        prop_assert_eq!(sequential, parallel);
    }

    /// Property: every snippet gets exactly one entry, in document order, with the right outcome.
    #[test]
    fn every_snippet_is_reported_once(broken in prop::collection::vec(any::<bool>(), 0..12), jobs in 1usize..8) {
        let snippets = snippets(&broken);
        let report = run_snippets(&snippets, Vec::new(), &EchoExecutor, &settings(jobs), &mut JsonReporter::new(Vec::new()));

        prop_assert_eq!(report.entries.len(), broken.len());
        for (entry, (snippet, is_broken)) in report.entries.iter().zip(snippets.iter().zip(&broken)) {
            prop_assert_eq!(&entry.id, &snippet.id);
            let expected = if *is_broken { Outcome::Fail(FailureKind::OutputMismatch) } else { Outcome::Pass };
            prop_assert_eq!(entry.outcome, expected);
        }

        let summary = report.summary();
        prop_assert_eq!(summary.passed + summary.failed, summary.total);
        prop_assert_eq!(report.is_success(), !broken.contains(&true));
    }

    /// Property: filtering keeps exactly the matching snippets, in order.
    #[test]
    fn filter_keeps_matching_snippets(broken in prop::collection::vec(any::<bool>(), 0..12), keyword in "generated\\.md:[0-9]{1,2}") {
        let all = snippets(&broken);
        let kept = filter_snippets(all.clone(), Some(keyword.as_str()));
        let expected: Vec<Snippet> = all.into_iter().filter(|s| s.filter_key().contains(keyword.as_str())).collect();
        prop_assert_eq!(kept, expected);
    }
}
