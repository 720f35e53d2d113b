//! `snipcheck.toml` configuration
//!
//! ```toml
//! languages = ["ts", "typescript"]
//! default_mode = "loose"
//! timeout_secs = 10
//!
//! [toolchain]
//! compile = ["tsc", "--outDir", "{out_dir}", "{mode_flags}", "{source}"]
//! run = ["node", "{out_dir}/{stem}.js"]
//! strict_flags = ["--strict"]
//! ```
//!
//! Every key is optional; missing keys take the defaults below. Unknown keys are rejected.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use snipcheck_core::{CompileMode, DEFAULT_LANGUAGES, ExtractOptions, Policy};
use thiserror::Error;

/// Config file name looked up next to the documents and in the working directory.
pub const CONFIG_FILE_NAME: &str = "snipcheck.toml";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read config file {}", .path.display())]
    #[diagnostic(code(snipcheck::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}", .path.display())]
    #[diagnostic(code(snipcheck::config::parse), help("see the snipcheck.toml reference in README.md"))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(snipcheck::config::invalid))]
    Invalid(String),
}

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Fence languages that are extracted as snippets.
    pub languages: Vec<String>,
    /// Compile mode for snippets nothing else decides.
    pub default_mode: CompileMode,
    /// Fail error demonstrations the compiler accepts.
    pub require_expected_errors: bool,
    /// Wall-clock limit per toolchain step.
    pub timeout_secs: u64,
    /// Worker threads; 1 runs sequentially.
    pub jobs: usize,
    pub toolchain: ToolchainConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            default_mode: CompileMode::Loose,
            require_expected_errors: false,
            timeout_secs: 10,
            jobs: 1,
            toolchain: ToolchainConfig::default(),
        }
    }
}

/// Command templates used to compile and run a snippet.
///
/// Placeholders: `{source}` (snippet file), `{out_dir}` (scratch output directory), `{stem}`
/// (snippet file name without extension). An argument that is exactly `{mode_flags}` expands to
/// `strict_flags` or `loose_flags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Empty to skip the compile step.
    pub compile: Vec<String>,
    pub run: Vec<String>,
    pub strict_flags: Vec<String>,
    pub loose_flags: Vec<String>,
    /// Extension of the snippet file written to the scratch directory.
    pub extension: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        let args = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            compile: args(&[
                "tsc",
                "--outDir",
                "{out_dir}",
                "--target",
                "es2020",
                "--module",
                "commonjs",
                "--moduleDetection",
                "force",
                "--pretty",
                "false",
                "{mode_flags}",
                "{source}",
            ]),
            run: args(&["node", "{out_dir}/{stem}.js"]),
            strict_flags: args(&["--strict"]),
            loose_flags: Vec::new(),
            extension: "ts".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(CONFIG_FILE_NAME),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Find the config for a documents path: next to the documents first, then the working
    /// directory. Defaults when neither has one.
    pub fn discover(target: &Path) -> Result<Self, ConfigError> {
        let base = if target.is_dir() {
            Some(target)
        } else {
            target.parent()
        };

        let candidates = base
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .into_iter()
            .chain(std::iter::once(PathBuf::from(CONFIG_FILE_NAME)));

        for candidate in candidates {
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.is_empty() {
            return Err(ConfigError::Invalid("`languages` must name at least one fence language".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("`timeout_secs` must be greater than zero".into()));
        }
        if self.jobs == 0 {
            return Err(ConfigError::Invalid("`jobs` must be at least 1".into()));
        }
        if self.toolchain.run.is_empty() {
            return Err(ConfigError::Invalid("`toolchain.run` must not be empty".into()));
        }
        if self.toolchain.extension.is_empty() || self.toolchain.extension.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "`toolchain.extension` is not a valid file extension: {:?}",
                self.toolchain.extension
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            languages: self.languages.clone(),
            default_mode: self.default_mode,
        }
    }

    pub fn policy(&self) -> Policy {
        Policy {
            require_expected_errors: self.require_expected_errors,
        }
    }
}
