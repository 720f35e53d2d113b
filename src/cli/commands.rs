//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use snipcheck_core::Snippet;

use super::verify_interfaces::{DefaultDocumentDiscovery, DocumentDiscovery};
use super::verify_runner::{
    Collection, ConsoleReporter, JsonReporter, RunSettings, collect_snippets, filter_snippets, run_snippets,
};
use super::{CliError, CliResult, ExitCode, ReportFormat};
use crate::config::{Config, ConfigError};
use crate::runner::ProcessExecutor;

/// Maximum document size (16 MB)
///
/// Larger documents are reported as unreadable instead of being loaded.
const MAX_DOCUMENT_SIZE: u64 = 16 * 1024 * 1024;

/// Options for `snipcheck verify`, after clap parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    pub path: PathBuf,
    pub verbose: bool,
    pub stop_on_fail: bool,
    pub filter: Option<String>,
    pub jobs: Option<usize>,
    pub format: ReportFormat,
    pub timeout_secs: Option<u64>,
    pub config: Option<PathBuf>,
    pub require_expected_errors: bool,
}

/// Read a document with a size check.
pub fn read_document(path: &Path) -> CliResult<String> {
    let metadata = fs::metadata(path)
        .map_err(|e| CliError::failure(format!("Cannot access file '{}': {}", path.display(), e)))?;

    if metadata.len() > MAX_DOCUMENT_SIZE {
        return Err(CliError::failure(format!(
            "Document '{}' is too large ({} bytes, max {} bytes)",
            path.display(),
            metadata.len(),
            MAX_DOCUMENT_SIZE
        )));
    }

    fs::read_to_string(path)
        .map_err(|e| CliError::failure(format!("Error reading file '{}': {}", path.display(), e)))
}

/// Render a config error with its miette diagnostic (code, cause chain, help).
fn config_failure(err: ConfigError) -> CliError {
    CliError::failure(format!("{:?}", miette::Report::new(err)))
}

/// Load the config named on the command line, or discover one for `path`.
pub fn load_config(path: &Path, explicit: Option<&Path>) -> CliResult<Config> {
    match explicit {
        Some(file) => Config::load(file),
        None => Config::discover(path),
    }
    .map_err(config_failure)
}

/// Discover documents and extract their snippets.
fn collect(path: &Path, config: &Config) -> CliResult<Collection> {
    let files = DefaultDocumentDiscovery
        .discover_documents(path)
        .map_err(|e| CliError::failure(e.to_string()))?;

    if files.is_empty() {
        return Err(CliError::failure(format!(
            "No documents found in '{}'\nDocuments are Markdown files ending in .md or .markdown",
            path.display()
        )));
    }
    tracing::debug!(count = files.len(), "discovered documents");

    Ok(collect_snippets(&files, &config.extract_options(), |file| {
        read_document(file).map_err(|e| e.message)
    }))
}

/// `snipcheck verify`: extract, run and compare every snippet.
pub fn verify(options: &VerifyOptions) -> CliResult<ExitCode> {
    let mut config = load_config(&options.path, options.config.as_deref())?;
    if let Some(jobs) = options.jobs {
        config.jobs = jobs;
    }
    if let Some(timeout_secs) = options.timeout_secs {
        config.timeout_secs = timeout_secs;
    }
    if options.require_expected_errors {
        config.require_expected_errors = true;
    }
    config.validate().map_err(config_failure)?;

    let collection = collect(&options.path, &config)?;
    let snippets = filter_snippets(collection.snippets, options.filter.as_deref());

    let executor = ProcessExecutor::from_config(&config);
    let settings = RunSettings {
        jobs: config.jobs,
        stop_on_fail: options.stop_on_fail,
        policy: config.policy(),
    };

    let stdout = io::stdout();
    let report = match options.format {
        ReportFormat::Human => {
            let color = stdout.is_terminal() && std::env::var_os("NO_COLOR").is_none();
            let mut reporter = ConsoleReporter::new(stdout.lock(), options.verbose, color);
            run_snippets(&snippets, collection.warnings, &executor, &settings, &mut reporter)
        }
        ReportFormat::Json => {
            let mut reporter = JsonReporter::new(stdout.lock());
            run_snippets(&snippets, collection.warnings, &executor, &settings, &mut reporter)
        }
    };

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// `snipcheck list`: show what would be verified without running anything.
pub fn list(path: &Path, config_file: Option<&Path>, format: ReportFormat) -> CliResult<ExitCode> {
    let config = load_config(path, config_file)?;
    let collection = collect(path, &config)?;

    let text = match format {
        ReportFormat::Human => render_listing(&collection),
        ReportFormat::Json => {
            let doc = serde_json::json!({
                "snippets": &collection.snippets,
                "warnings": &collection.warnings,
            });
            serde_json::to_string_pretty(&doc)
                .map_err(|e| CliError::failure(format!("Error serializing listing: {}", e)))?
        }
    };

    let mut out = io::stdout().lock();
    writeln!(out, "{text}").map_err(|e| CliError::failure(format!("Error writing listing: {}", e)))?;
    Ok(ExitCode::SUCCESS)
}

/// Human listing: one line per snippet, then the warnings.
pub fn render_listing(collection: &Collection) -> String {
    let mut out = String::new();
    for snippet in &collection.snippets {
        out.push_str(&describe_snippet(snippet));
        out.push('\n');
    }
    for warning in &collection.warnings {
        out.push_str(&format!("warning: {warning}\n"));
    }
    out.push_str(&format!(
        "{} snippet(s), {} warning(s)",
        collection.snippets.len(),
        collection.warnings.len()
    ));
    out
}

fn describe_snippet(snippet: &Snippet) -> String {
    let mut line = format!(
        "{} {} [{} via {}]",
        snippet.id, snippet.language, snippet.mode, snippet.mode_source
    );

    let flags = [
        (snippet.flags.skip, "ignore"),
        (snippet.flags.check_only, "check-only"),
        (snippet.flags.diverges, "diverges"),
    ];
    for (set, name) in flags {
        if set {
            line.push(' ');
            line.push_str(name);
        }
    }

    match &snippet.expected {
        Some(lines) => line.push_str(&format!(" output={}", lines.len())),
        None => line.push_str(" no-output"),
    }
    if !snippet.errors.is_empty() {
        line.push_str(&format!(" errors={}", snippet.errors.len()));
    }
    line
}
