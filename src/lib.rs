#![forbid(unsafe_code)]
//! snipcheck: documentation snippet verification
//!
//! Extracts TypeScript snippets from Markdown tutorials, compiles and runs each one in isolation,
//! and compares what it prints against the `// Output:` comments in the document. The pure parts
//! (extraction, comparison, classification, report model) live in `snipcheck_core`; this crate
//! adds configuration, the process-based executor and the CLI.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod runner;
pub mod version;

pub use config::{Config, ConfigError, ToolchainConfig};
pub use runner::{ExecError, ProcessExecutor};
pub use snipcheck_core;
