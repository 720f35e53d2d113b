//! Comment annotations inside snippet bodies.
//!
//! Two conventions are recognised:
//!
//! - **Expected output**: `console.log(x); // Output: 42`, or a bare `// Output:` line followed by
//!   one `// line` comment per expected output line.
//! - **Error demonstrations**: a comment starting with `Error` (`// Error: ...`,
//!   `// Error in strict mode`). The annotated code can be live or itself commented out
//!   (`// x = "a"; // Error: ...`).

use crate::snippet::ErrorAnnotation;

/// Annotations collected from one snippet body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Annotations {
    pub expected: Option<Vec<String>>,
    pub errors: Vec<ErrorAnnotation>,
}

impl Annotations {
    /// Whether any error annotation asks for strict checking.
    pub fn wants_strict(&self) -> bool {
        self.errors.iter().any(|e| e.strict_only)
    }
}

/// Scan a snippet body for output and error annotations.
pub fn scan(body: &str) -> Annotations {
    let mut expected: Option<Vec<String>> = None;
    let mut errors = Vec::new();
    // Set after a bare `// Output:`; consecutive comment lines are expected output.
    let mut collecting = false;
    let mut last_code_line: Option<usize> = None;

    for (idx, line) in body.lines().enumerate() {
        let trimmed = line.trim_start();

        if let Some(comment) = trimmed.strip_prefix("//") {
            let text = comment.trim();

            if let Some(rest) = strip_output_marker(text) {
                let out = expected.get_or_insert_with(Vec::new);
                if rest.is_empty() {
                    collecting = true;
                } else {
                    out.push(rest.to_string());
                    collecting = false;
                }
                continue;
            }

            if collecting {
                let value = comment.strip_prefix(' ').unwrap_or(comment).trim_end();
                expected.get_or_insert_with(Vec::new).push(value.to_string());
                continue;
            }

            // `// code; // Error: ...`: annotated code that is commented out.
            let (inner_code, inner_comment) = split_line_comment(text);
            if let Some(inner) = inner_comment.map(str::trim) {
                if !inner_code.trim().is_empty() && is_error_marker(inner) {
                    errors.push(error_annotation(idx, inner, true));
                    continue;
                }
            }

            // `// Error: ...` on its own line refers to the code just above it.
            if is_error_marker(text) {
                errors.push(error_annotation(last_code_line.unwrap_or(idx), text, false));
            }
            continue;
        }

        collecting = false;
        if trimmed.is_empty() {
            continue;
        }
        last_code_line = Some(idx);

        let (_, comment) = split_line_comment(line);
        let Some(comment) = comment else {
            continue;
        };
        let text = comment.trim();
        if let Some(rest) = strip_output_marker(text) {
            let out = expected.get_or_insert_with(Vec::new);
            if !rest.is_empty() {
                out.push(rest.to_string());
            }
        } else if is_error_marker(text) {
            errors.push(error_annotation(idx, text, false));
        }
    }

    Annotations { expected, errors }
}

fn error_annotation(line: usize, text: &str, commented_out: bool) -> ErrorAnnotation {
    let lower = text.to_ascii_lowercase();
    ErrorAnnotation {
        line,
        message: text.trim().to_string(),
        commented_out,
        strict_only: lower.contains("strict mode") || lower.contains("strictnullchecks"),
    }
}

/// Return the text after an `Output:` marker (case-insensitive), trimmed.
fn strip_output_marker(text: &str) -> Option<&str> {
    const MARKER: &str = "output:";
    if text.len() >= MARKER.len() && text.is_char_boundary(MARKER.len()) {
        let (head, rest) = text.split_at(MARKER.len());
        if head.eq_ignore_ascii_case(MARKER) {
            return Some(rest.trim());
        }
    }
    None
}

/// `Error`, `Error: ...`, `Error - ...`, `Error in strict mode`, `Error TS2322: ...`.
///
/// Prose such as `Error handling` or `ErrorHandler` is not a marker.
fn is_error_marker(text: &str) -> bool {
    const MARKER: &str = "error";
    if text.len() < MARKER.len() || !text.is_char_boundary(MARKER.len()) {
        return false;
    }
    let (head, rest) = text.split_at(MARKER.len());
    if !head.eq_ignore_ascii_case(MARKER) {
        return false;
    }
    if rest.is_empty() || rest.starts_with(':') {
        return true;
    }
    if !rest.starts_with(char::is_whitespace) {
        return false;
    }

    let rest = rest.trim_start();
    if rest.is_empty() || rest.starts_with(['-', ':']) {
        return true;
    }
    let word = rest.split(|c: char| !c.is_ascii_alphanumeric()).next().unwrap_or("");
    word.eq_ignore_ascii_case("in") || is_compiler_code(word)
}

/// `TS2322` and friends.
fn is_compiler_code(word: &str) -> bool {
    word.len() > 2
        && word[..2].eq_ignore_ascii_case("ts")
        && word[2..].chars().all(|c| c.is_ascii_digit())
}

/// Split a line into code and trailing `//` comment, ignoring `//` inside string literals.
pub fn split_line_comment(line: &str) -> (&str, Option<&str>) {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    return (&line[..i], Some(&line[i + 2..]));
                }
                _ => {}
            },
        }
        i += 1;
    }

    (line, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_output_marker() {
        let ann = scan("const greet = (name: string): string => { return `Hello, ${name}!`; };\nconsole.log(greet(\"TypeScript\")); // Output: Hello, TypeScript!\n");
        assert_eq!(ann.expected, Some(vec!["Hello, TypeScript!".to_string()]));
        assert!(ann.errors.is_empty());
    }

    #[test]
    fn test_output_block_marker() {
        let body = "let fruits = [\"apple\", \"banana\"];\nfruits.forEach(f => console.log(f));\n// Output:\n// apple\n// banana\n";
        let ann = scan(body);
        assert_eq!(ann.expected, Some(vec!["apple".to_string(), "banana".to_string()]));
    }

    #[test]
    fn test_output_block_stops_at_code() {
        let body = "// Output:\n// one\nconsole.log(\"x\"); // not output\n// two\n";
        let ann = scan(body);
        assert_eq!(ann.expected, Some(vec!["one".to_string()]));
    }

    #[test]
    fn test_multiple_inline_markers_accumulate() {
        let body = "console.log(1); // Output: 1\nconsole.log(2); // output: 2\n";
        assert_eq!(scan(body).expected, Some(vec!["1".to_string(), "2".to_string()]));
    }

    #[test]
    fn test_no_marker_means_no_expected_output() {
        let ann = scan("let x = 1;\n// just a comment\nconsole.log(x);\n");
        assert_eq!(ann.expected, None);
    }

    #[test]
    fn test_empty_block_marker_declares_empty_output() {
        assert_eq!(scan("let x = 1;\n// Output:\n").expected, Some(Vec::new()));
    }

    #[test]
    fn test_live_error_annotation_strict() {
        let ann = scan("let name: string = null; // Error in strict mode\n");
        assert_eq!(ann.errors.len(), 1);
        let err = &ann.errors[0];
        assert_eq!(err.line, 0);
        assert!(!err.commented_out);
        assert!(err.strict_only);
        assert!(ann.wants_strict());
    }

    #[test]
    fn test_commented_out_error_annotation() {
        let ann = scan("let age: number = 30;\n// age = \"thirty\"; // Error: Type 'string' is not assignable to type 'number'\n");
        assert_eq!(ann.errors.len(), 1);
        let err = &ann.errors[0];
        assert_eq!(err.line, 1);
        assert!(err.commented_out);
        assert!(!err.strict_only);
        assert_eq!(err.message, "Error: Type 'string' is not assignable to type 'number'");
    }

    #[test]
    fn test_standalone_error_comment_targets_previous_code_line() {
        let ann = scan("let tuple: [string, number] = [\"a\", 1];\ntuple = [1, \"a\"];\n// Error: Type 'number' is not assignable\n");
        assert_eq!(ann.errors.len(), 1);
        assert_eq!(ann.errors[0].line, 1);
        assert!(!ann.errors[0].commented_out);
    }

    #[test]
    fn test_error_word_prefix_not_matched() {
        let ann = scan("class ErrorHandler {} // ErrorHandler handles things\n");
        assert!(ann.errors.is_empty());
    }

    #[test]
    fn test_error_prose_comments_not_matched() {
        let body = "\
try {
  risky();
} catch (e) {
  // Error handling
  console.log(\"caught\"); // Output: caught
}
log(e); // Error messages are logged below
";
        let ann = scan(body);
        assert!(ann.errors.is_empty());
        assert_eq!(ann.expected, Some(vec!["caught".to_string()]));
    }

    #[test]
    fn test_error_marker_forms() {
        for text in [
            "Error",
            "Error: Type 'null' is not assignable",
            "error - cannot assign",
            "Error in strict mode",
            "Error TS2322: Type 'string' is not assignable",
        ] {
            assert!(is_error_marker(text), "{text}");
        }
        for text in ["Error handling", "Errors are logged", "Error messages below", "ErrorHandler"] {
            assert!(!is_error_marker(text), "{text}");
        }
    }

    #[test]
    fn test_split_ignores_slashes_in_strings() {
        let (code, comment) = split_line_comment("const url = \"https://example.com\"; // link");
        assert_eq!(code, "const url = \"https://example.com\"; ");
        assert_eq!(comment, Some(" link"));
    }

    #[test]
    fn test_split_handles_escaped_quotes() {
        let (code, comment) = split_line_comment(r#"let s = "a \" // b"; // c"#);
        assert_eq!(code, r#"let s = "a \" // b"; "#);
        assert_eq!(comment, Some(" c"));
    }

    #[test]
    fn test_split_template_literal() {
        let (_, comment) = split_line_comment("let t = `//${x}`;");
        assert_eq!(comment, None);
    }
}
