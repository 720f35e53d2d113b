//! Provide the pure half of snipcheck: snippet extraction, annotation parsing, output comparison,
//! outcome classification and the report model.
//!
//! ## Notes
//!
//! - **No IO**: callers read documents and run toolchains; this crate only sees text and results.
//! - Everything here is deterministic, so the same documents and results always give the same
//!   [`Report`].

pub mod annotations;
pub mod compare;
pub mod extract;
pub mod outcome;
pub mod report;
pub mod snippet;

pub use compare::{Comparison, compare_output};
pub use extract::{DEFAULT_LANGUAGES, ExtractOptions, Extraction, ExtractionWarning, extract};
pub use outcome::{ExecutionResult, FailureKind, Outcome, Policy, Stage, Verdict, classify};
pub use report::{Report, ReportEntry, Summary};
pub use snippet::{CompileMode, ErrorAnnotation, ModeSource, Snippet, SnippetFlags, SnippetId};
