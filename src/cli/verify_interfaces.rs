//! Verify runner I/O boundary interfaces
//!
//! This module defines trait-based abstractions for the two I/O-heavy operations:
//! - Document discovery (filesystem walk)
//! - Snippet execution (toolchain invocation + result capture)
//!
//! The orchestration in `verify_runner` only sees these traits, so tests can drive it with
//! in-memory documents and scripted results.

use std::path::{Path, PathBuf};

use snipcheck_core::{ExecutionResult, Snippet};
use thiserror::Error;
use walkdir::WalkDir;

use crate::runner::ExecError;

/// Errors that occur while discovering documents
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("path does not exist: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

// ============================================================================
// Document Discovery Interface
// ============================================================================

/// Find the documentation files under a path.
pub trait DocumentDiscovery {
    /// Return the documents under `path`, sorted by path.
    fn discover_documents(&self, path: &Path) -> Result<Vec<PathBuf>, DiscoveryError>;
}

// ============================================================================
// Snippet Executor Interface
// ============================================================================

/// Compile and run one snippet in isolation.
///
/// Implementations must not share mutable state between calls; the runner may call `execute`
/// from several worker threads at once.
pub trait SnippetExecutor: Sync {
    fn execute(&self, snippet: &Snippet) -> Result<ExecutionResult, ExecError>;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Markdown file extensions picked up by discovery.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Recursive filesystem discovery of markdown documents.
pub struct DefaultDocumentDiscovery;

impl DocumentDiscovery for DefaultDocumentDiscovery {
    fn discover_documents(&self, path: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !path.exists() {
            return Err(DiscoveryError::Missing(path.to_path_buf()));
        }
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry));

        for entry in walker {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                path: path.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_file() && is_document(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }
}

fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_str().unwrap_or("");
    name.starts_with('.') || name == "target" || name == "node_modules"
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.iter().any(|d| d.eq_ignore_ascii_case(ext)))
}
