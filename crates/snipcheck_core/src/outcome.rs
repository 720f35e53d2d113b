//! Execution results and their classification into per-snippet outcomes.

use std::fmt;

use serde::Serialize;

use crate::compare::compare_output;
use crate::snippet::{Snippet, SnippetId};

/// Toolchain step a snippet was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Compile,
    Run,
}

/// What happened when one snippet was compiled and (maybe) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub id: SnippetId,
    /// Stdout lines of the run step.
    pub output: Vec<String>,
    /// Every step that was attempted exited successfully.
    pub success: bool,
    /// Compiler output when the compile step failed.
    pub diagnostics: Option<String>,
    /// Stderr of the run step.
    pub stderr: String,
    /// Whether the run step was attempted at all.
    pub ran: bool,
    /// Step killed by the wall-clock limit.
    pub timed_out: Option<Stage>,
    /// The compile or run command could not be started.
    pub toolchain_error: Option<String>,
}

impl ExecutionResult {
    pub fn new(id: SnippetId) -> Self {
        Self {
            id,
            output: Vec::new(),
            success: true,
            diagnostics: None,
            stderr: String::new(),
            ran: false,
            timed_out: None,
            toolchain_error: None,
        }
    }

    pub fn with_toolchain_error(id: SnippetId, message: impl Into<String>) -> Self {
        Self {
            success: false,
            toolchain_error: Some(message.into()),
            ..Self::new(id)
        }
    }

    pub fn compile_failed(&self) -> bool {
        self.diagnostics.is_some()
    }
}

/// Why a snippet failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CompileError,
    RuntimeError,
    Timeout,
    OutputMismatch,
    /// An error demonstration compiled cleanly (only with `require_expected_errors`).
    ExpectedErrorMissing,
    Toolchain,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::CompileError => "compile error",
            FailureKind::RuntimeError => "runtime error",
            FailureKind::Timeout => "timeout",
            FailureKind::OutputMismatch => "output mismatch",
            FailureKind::ExpectedErrorMissing => "expected compile error missing",
            FailureKind::Toolchain => "toolchain error",
        };
        f.write_str(s)
    }
}

/// Final classification of one snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail(FailureKind),
    /// No declared output to check against.
    Unverifiable,
    /// An error demonstration; compile failure is the documented behaviour.
    ExpectedCompileError,
    /// A documented non-returning snippet stopped by the wall-clock limit.
    TerminatedDivergent,
    Skipped,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "PASS"),
            Outcome::Fail(kind) => write!(f, "FAIL ({kind})"),
            Outcome::Unverifiable => write!(f, "UNVERIFIABLE"),
            Outcome::ExpectedCompileError => write!(f, "XFAIL (expected compile error)"),
            Outcome::TerminatedDivergent => write!(f, "TERMINATED (expected divergent)"),
            Outcome::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Classification knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Policy {
    /// Fail error demonstrations the compiler accepts instead of noting it.
    pub require_expected_errors: bool,
}

/// Outcome plus supporting detail for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub diff: Option<String>,
    pub note: Option<String>,
}

impl Verdict {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            diff: None,
            note: None,
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        if !note.trim().is_empty() {
            self.note = Some(note.trim_end().to_string());
        }
        self
    }
}

/// Classify a snippet given its execution result (`None` when it was never executed).
///
/// Precedence, first match wins: skipped, toolchain failure, error demonstration, timeout,
/// no declared output, compile failure, runtime failure, check-only, output comparison.
pub fn classify(snippet: &Snippet, result: Option<&ExecutionResult>, policy: Policy) -> Verdict {
    let Some(result) = result.filter(|_| !snippet.flags.skip) else {
        return Verdict::new(Outcome::Skipped);
    };

    if let Some(err) = &result.toolchain_error {
        return Verdict::new(Outcome::Fail(FailureKind::Toolchain)).with_note(err.as_str());
    }

    if snippet.is_error_demo() {
        if result.compile_failed() {
            return Verdict::new(Outcome::ExpectedCompileError);
        }
        let note = if result.timed_out == Some(Stage::Compile) {
            "compiler timed out before reporting the annotated error"
        } else {
            "compiler accepted the code annotated as an error"
        };
        return if policy.require_expected_errors {
            Verdict::new(Outcome::Fail(FailureKind::ExpectedErrorMissing)).with_note(note)
        } else {
            Verdict::new(Outcome::ExpectedCompileError).with_note(note)
        };
    }

    match result.timed_out {
        Some(Stage::Run) if snippet.flags.diverges => return Verdict::new(Outcome::TerminatedDivergent),
        Some(stage) => {
            let step = match stage {
                Stage::Compile => "compile",
                Stage::Run => "run",
            };
            return Verdict::new(Outcome::Fail(FailureKind::Timeout))
                .with_note(format!("{step} step exceeded the wall-clock limit"));
        }
        None => {}
    }

    let Some(expected) = snippet.expected.as_deref() else {
        let mut verdict = Verdict::new(Outcome::Unverifiable);
        if let Some(diag) = &result.diagnostics {
            verdict = verdict.with_note(format!("compile failed:\n{diag}"));
        } else if !result.success {
            verdict = verdict.with_note(format!("run failed:\n{}", result.stderr));
        }
        return verdict;
    };

    if let Some(diag) = &result.diagnostics {
        return Verdict::new(Outcome::Fail(FailureKind::CompileError)).with_note(diag.as_str());
    }
    if !result.success {
        return Verdict::new(Outcome::Fail(FailureKind::RuntimeError)).with_note(result.stderr.as_str());
    }
    if !result.ran {
        return Verdict::new(Outcome::Unverifiable).with_note("check-only: output not observed");
    }

    let comparison = compare_output(expected, result.output.as_slice());
    if comparison.matched {
        Verdict::new(Outcome::Pass)
    } else {
        Verdict {
            outcome: Outcome::Fail(FailureKind::OutputMismatch),
            diff: comparison.diff,
            note: None,
        }
    }
}
