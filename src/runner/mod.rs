//! Snippet execution through an external toolchain.
//!
//! Every snippet gets its own scratch directory, so nothing one snippet declares or writes is
//! visible to another. The directory is removed when the snippet is done.

pub mod process;
pub mod template;

use std::fs;
use std::path::Path;
use std::time::Duration;

use snipcheck_core::{ExecutionResult, Snippet, Stage};
use thiserror::Error;

use crate::cli::verify_interfaces::SnippetExecutor;
use crate::config::{Config, ToolchainConfig};

use process::run_with_timeout;
use template::TemplateVars;

/// Errors that prevent a snippet from being executed at all.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("toolchain command is empty: `{0}`")]
    EmptyCommand(String),

    #[error("scratch directory error: {0}")]
    Scratch(#[from] std::io::Error),
}

const SNIPPET_STEM: &str = "snippet";

/// Compiles and runs snippets with the configured command templates.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    toolchain: ToolchainConfig,
    timeout: Duration,
}

impl ProcessExecutor {
    pub fn new(toolchain: ToolchainConfig, timeout: Duration) -> Self {
        Self { toolchain, timeout }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.toolchain.clone(), config.timeout())
    }
}

impl SnippetExecutor for ProcessExecutor {
    #[tracing::instrument(skip_all, fields(snippet = %snippet.id, mode = %snippet.mode))]
    fn execute(&self, snippet: &Snippet) -> Result<ExecutionResult, ExecError> {
        let scratch = tempfile::Builder::new().prefix("snipcheck-").tempdir()?;
        let out_dir = scratch.path().join("out");
        fs::create_dir_all(&out_dir)?;
        let source_path = scratch
            .path()
            .join(format!("{SNIPPET_STEM}.{}", self.toolchain.extension));

        let error_demo = snippet.is_error_demo();
        let source = if error_demo {
            snippet.error_probe_source()
        } else {
            snippet.body.clone()
        };
        fs::write(&source_path, source)?;

        let vars = TemplateVars {
            source: &source_path,
            out_dir: &out_dir,
            stem: SNIPPET_STEM,
            mode: snippet.mode,
        };
        let mut result = ExecutionResult::new(snippet.id.clone());
        let has_compile_step = !self.toolchain.compile.is_empty();

        if has_compile_step {
            let argv = template::expand(&self.toolchain.compile, &self.toolchain, &vars)?;
            let out = run_with_timeout(&argv, scratch.path(), self.timeout)?;
            if out.timed_out {
                result.success = false;
                result.timed_out = Some(Stage::Compile);
                return Ok(result);
            }
            if !out.success {
                result.success = false;
                result.diagnostics = Some(relabel(&combine(&out.stdout, &out.stderr), &source_path, snippet));
                return Ok(result);
            }
        }

        // Without a compile step an error demonstration can only be probed by running it.
        let probe_by_running = error_demo && !has_compile_step;
        if (error_demo && !probe_by_running) || snippet.flags.check_only {
            return Ok(result);
        }

        let argv = template::expand(&self.toolchain.run, &self.toolchain, &vars)?;
        let out = run_with_timeout(&argv, scratch.path(), self.timeout)?;
        result.ran = true;
        if out.timed_out {
            result.success = false;
            result.timed_out = Some(Stage::Run);
            return Ok(result);
        }

        result.success = out.success;
        result.output = out.stdout.lines().map(str::to_string).collect();
        if probe_by_running && !out.success {
            result.diagnostics = Some(relabel(&out.stderr, &source_path, snippet));
        }
        result.stderr = out.stderr;
        Ok(result)
    }
}

fn combine(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
        (false, true) => stdout.trim_end().to_string(),
        _ => stderr.trim_end().to_string(),
    }
}

/// Point diagnostics at the document instead of the scratch file.
fn relabel(text: &str, source_path: &Path, snippet: &Snippet) -> String {
    text.replace(&*source_path.to_string_lossy(), &snippet.id.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_streams() {
        assert_eq!(combine("a\n", ""), "a");
        assert_eq!(combine("", "b\n"), "b");
        assert_eq!(combine("a\n", "b\n"), "a\nb");
        assert_eq!(combine(" ", " "), "");
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use snipcheck_core::{CompileMode, ErrorAnnotation, ModeSource, SnippetFlags, SnippetId};

        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        fn snippet(body: &str) -> Snippet {
            Snippet {
                id: SnippetId::new("docs/basics.md", 5, 0),
                language: "ts".to_string(),
                body: body.to_string(),
                mode: CompileMode::Loose,
                mode_source: ModeSource::Default,
                flags: SnippetFlags::default(),
                expected: None,
                errors: Vec::new(),
            }
        }

        /// `cat` as the "interpreter": output is the snippet source itself.
        fn cat_toolchain(compile: &[&str]) -> ToolchainConfig {
            ToolchainConfig {
                compile: strings(compile),
                run: strings(&["cat", "{source}"]),
                ..ToolchainConfig::default()
            }
        }

        #[test]
        fn test_runs_snippet_in_scratch_dir() {
            let exec = ProcessExecutor::new(cat_toolchain(&[]), Duration::from_secs(10));
            let result = exec.execute(&snippet("line one\nline two\n")).unwrap();
            assert!(result.ran);
            assert!(result.success);
            assert_eq!(result.output, vec!["line one", "line two"]);
        }

        #[test]
        fn test_compile_failure_is_relabelled() {
            let exec = ProcessExecutor::new(
                cat_toolchain(&["sh", "-c", "echo \"$0(1,5): error TS2322\"; exit 2", "{source}"]),
                Duration::from_secs(10),
            );
            let result = exec.execute(&snippet("let x: string = null;\n")).unwrap();
            assert!(!result.ran);
            assert!(!result.success);
            assert_eq!(result.diagnostics.as_deref(), Some("docs/basics.md:5(1,5): error TS2322"));
        }

        #[test]
        fn test_error_demo_probe_is_compiled_not_run() {
            let exec = ProcessExecutor::new(
                cat_toolchain(&["sh", "-c", "grep -q '^x = 1;' \"$0\" && exit 1; exit 0", "{source}"]),
                Duration::from_secs(10),
            );
            let mut s = snippet("let x: string;\n// x = 1; // Error: Type 'number' is not assignable\n");
            s.errors.push(ErrorAnnotation {
                line: 1,
                message: "Error: Type 'number' is not assignable".to_string(),
                commented_out: true,
                strict_only: false,
            });
            let result = exec.execute(&s).unwrap();
            assert!(result.compile_failed());
            assert!(!result.ran);
        }

        #[test]
        fn test_check_only_skips_run() {
            let exec = ProcessExecutor::new(cat_toolchain(&["true"]), Duration::from_secs(10));
            let mut s = snippet("let a = 1;\n");
            s.flags.check_only = true;
            let result = exec.execute(&s).unwrap();
            assert!(result.success);
            assert!(!result.ran);
        }

        #[test]
        fn test_run_timeout() {
            let toolchain = ToolchainConfig {
                compile: Vec::new(),
                run: strings(&["sleep", "30"]),
                ..ToolchainConfig::default()
            };
            let exec = ProcessExecutor::new(toolchain, Duration::from_millis(200));
            let result = exec.execute(&snippet("while (true) {}\n")).unwrap();
            assert_eq!(result.timed_out, Some(Stage::Run));
            assert!(!result.success);
        }

        #[test]
        fn test_missing_toolchain_is_an_error() {
            let toolchain = ToolchainConfig {
                compile: strings(&["snipcheck-no-such-compiler", "{source}"]),
                ..ToolchainConfig::default()
            };
            let exec = ProcessExecutor::new(toolchain, Duration::from_secs(1));
            let err = exec.execute(&snippet("let a = 1;\n")).unwrap_err();
            assert!(err.to_string().starts_with("failed to start `snipcheck-no-such-compiler`"));
        }
    }
}
