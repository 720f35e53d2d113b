//! The snippet model: one fenced code block plus everything the document says about it.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identify a snippet by document and position.
///
/// Ordering is document order: by file, then by the line of the opening fence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SnippetId {
    pub file: PathBuf,
    /// 1-based line of the opening fence.
    pub line: usize,
    /// 0-based position among the snippets of the same document.
    pub ordinal: usize,
}

impl SnippetId {
    pub fn new(file: impl Into<PathBuf>, line: usize, ordinal: usize) -> Self {
        Self {
            file: file.into(),
            line,
            ordinal,
        }
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Type-checking mode a snippet is compiled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileMode {
    Strict,
    #[default]
    Loose,
}

impl fmt::Display for CompileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileMode::Strict => write!(f, "strict"),
            CompileMode::Loose => write!(f, "loose"),
        }
    }
}

/// Where a snippet's compile mode was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSource {
    /// `strict` / `no-strict` in the fence info string
    Attribute,
    /// an `Error in strict mode` annotation
    Annotation,
    /// the prose leading up to the block
    Prose,
    /// the configured default
    Default,
}

impl fmt::Display for ModeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeSource::Attribute => write!(f, "attribute"),
            ModeSource::Annotation => write!(f, "annotation"),
            ModeSource::Prose => write!(f, "prose"),
            ModeSource::Default => write!(f, "default"),
        }
    }
}

/// Behaviour switches carried by fence attributes and prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SnippetFlags {
    /// `ignore`: extracted and reported, never compiled.
    pub skip: bool,
    /// `check-only` / `no-run`: compiled, never executed.
    pub check_only: bool,
    /// Documented as non-returning; a timeout is the expected end.
    pub diverges: bool,
}

/// An `// Error ...` annotation inside a snippet body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorAnnotation {
    /// 0-based line within the snippet body that the annotation applies to.
    pub line: usize,
    /// Annotation text after the comment marker (e.g. `Error: Type 'null' is not assignable`).
    pub message: String,
    /// The annotated code is itself commented out (`// x = 1; // Error: ...`).
    pub commented_out: bool,
    /// The error only occurs under strict checking (`Error in strict mode`).
    pub strict_only: bool,
}

/// A single extracted example block. Immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub id: SnippetId,
    pub language: String,
    pub body: String,
    pub mode: CompileMode,
    pub mode_source: ModeSource,
    pub flags: SnippetFlags,
    /// Lines declared by `// Output:` comments; `None` when the snippet declares no output.
    pub expected: Option<Vec<String>>,
    pub errors: Vec<ErrorAnnotation>,
}

impl Snippet {
    pub fn has_expected_output(&self) -> bool {
        self.expected.is_some()
    }

    /// Whether the snippet demonstrates a compile error under its own mode.
    ///
    /// A `strict mode` annotation in a snippet explicitly compiled loose shows the code being
    /// accepted, so it does not count.
    pub fn is_error_demo(&self) -> bool {
        self.errors
            .iter()
            .any(|e| !e.strict_only || self.mode == CompileMode::Strict)
    }

    /// Source to hand to the compiler when probing an error demonstration.
    ///
    /// Commented-out annotated lines are re-enabled so the compiler sees the offending code.
    pub fn error_probe_source(&self) -> String {
        let commented: Vec<usize> = self
            .errors
            .iter()
            .filter(|e| e.commented_out)
            .map(|e| e.line)
            .collect();
        if commented.is_empty() {
            return self.body.clone();
        }

        let mut out = String::with_capacity(self.body.len());
        for (idx, line) in self.body.lines().enumerate() {
            if commented.contains(&idx) {
                out.push_str(&uncomment(line));
            } else {
                out.push_str(line);
            }
            out.push('\n');
        }
        out
    }

    /// Text the keyword filter (`-k`) matches against.
    pub fn filter_key(&self) -> String {
        format!("{} {}", self.id, self.language)
    }
}

fn uncomment(line: &str) -> String {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    match trimmed.strip_prefix("//") {
        Some(rest) => format!("{indent}{}", rest.trim_start()),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(body: &str, mode: CompileMode, errors: Vec<ErrorAnnotation>) -> Snippet {
        Snippet {
            id: SnippetId::new("docs/classes.md", 12, 0),
            language: "ts".to_string(),
            body: body.to_string(),
            mode,
            mode_source: ModeSource::Default,
            flags: SnippetFlags::default(),
            expected: None,
            errors,
        }
    }

    #[test]
    fn test_id_display() {
        let id = SnippetId::new("docs/intro.md", 7, 2);
        assert_eq!(id.to_string(), "docs/intro.md:7");
    }

    #[test]
    fn test_id_orders_by_file_then_line() {
        let a = SnippetId::new("a.md", 30, 1);
        let b = SnippetId::new("a.md", 4, 0);
        let c = SnippetId::new("b.md", 1, 0);
        let mut ids = vec![c.clone(), a.clone(), b.clone()];
        ids.sort();
        assert_eq!(ids, vec![b, a, c]);
    }

    #[test]
    fn test_strict_only_error_ignored_in_loose_mode() {
        let errors = vec![ErrorAnnotation {
            line: 0,
            message: "Error in strict mode".to_string(),
            commented_out: false,
            strict_only: true,
        }];
        assert!(!snippet("let name: string = null;\n", CompileMode::Loose, errors.clone()).is_error_demo());
        assert!(snippet("let name: string = null;\n", CompileMode::Strict, errors).is_error_demo());
    }

    #[test]
    fn test_error_probe_uncomments_annotated_lines() {
        let body = "let age: number = 30;\n    // age = \"thirty\"; // Error: Type 'string' is not assignable\n// a plain comment\n";
        let errors = vec![ErrorAnnotation {
            line: 1,
            message: "Error: Type 'string' is not assignable".to_string(),
            commented_out: true,
            strict_only: false,
        }];
        let s = snippet(body, CompileMode::Loose, errors);
        assert_eq!(
            s.error_probe_source(),
            "let age: number = 30;\n    age = \"thirty\"; // Error: Type 'string' is not assignable\n// a plain comment\n"
        );
    }

    #[test]
    fn test_error_probe_without_commented_lines_is_body() {
        let s = snippet("let x: string = null; // Error\n", CompileMode::Strict, Vec::new());
        assert_eq!(s.error_probe_source(), s.body);
    }
}
