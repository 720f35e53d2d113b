//! Output comparison.
//!
//! Matching is exact and line-ordered after trimming trailing whitespace from every line.
//! Trailing blank lines at the end of either side are not significant.

use similar::{ChangeTag, TextDiff};

/// Result of comparing actual output against declared output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub matched: bool,
    /// Line diff (`-expected`, `+actual`); `None` when matched.
    pub diff: Option<String>,
}

/// Normalise output lines for comparison.
pub fn normalize_lines<S: AsRef<str>>(lines: &[S]) -> Vec<&str> {
    let mut out: Vec<&str> = lines.iter().map(|l| l.as_ref().trim_end()).collect();
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out
}

/// Compare actual output lines against expected lines.
pub fn compare_output<E: AsRef<str>, A: AsRef<str>>(expected: &[E], actual: &[A]) -> Comparison {
    let expected = normalize_lines(expected);
    let actual = normalize_lines(actual);

    if expected == actual {
        return Comparison {
            matched: true,
            diff: None,
        };
    }

    Comparison {
        matched: false,
        diff: Some(render_diff(&expected, &actual)),
    }
}

fn render_diff(expected: &[&str], actual: &[&str]) -> String {
    let old = join_lines(expected);
    let new = join_lines(actual);
    let diff = TextDiff::from_lines(&old, &new);

    let mut out = String::from("--- expected\n+++ actual\n");
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => ' ',
        };
        out.push(sign);
        out.push_str(change.value());
        if change.missing_newline() {
            out.push('\n');
        }
    }
    out
}

fn join_lines(lines: &[&str]) -> String {
    let mut s = String::new();
    for line in lines {
        s.push_str(line);
        s.push('\n');
    }
    s
}
