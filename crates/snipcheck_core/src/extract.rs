//! Snippet extraction from markdown documents.
//!
//! Extraction never fails: blocks the extractor cannot make sense of are skipped and recorded as
//! [`ExtractionWarning`]s, so tooling problems never block the prose.

use std::ops::Range;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;
use thiserror::Error;

use crate::annotations;
use crate::snippet::{CompileMode, ModeSource, Snippet, SnippetFlags, SnippetId};

/// Languages extracted when nothing else is configured.
pub const DEFAULT_LANGUAGES: &[&str] = &["ts", "typescript"];

/// A non-fatal problem found while extracting snippets.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    #[error("{}:{line}: unterminated code fence; block skipped", .file.display())]
    #[diagnostic(code(snipcheck::unterminated_fence), help("close the block with a matching ``` line"))]
    UnterminatedFence { file: PathBuf, line: usize },

    #[error("{}:{line}: empty code block; block skipped", .file.display())]
    #[diagnostic(code(snipcheck::empty_block))]
    EmptyBlock { file: PathBuf, line: usize },

    #[error("{}:{line}: both `strict` and `no-strict` given; block skipped", .file.display())]
    #[diagnostic(code(snipcheck::conflicting_modes), help("keep only one of the two attributes"))]
    ConflictingModes { file: PathBuf, line: usize },

    #[error("{}:{line}: unknown fence attribute `{attribute}` ignored", .file.display())]
    #[diagnostic(
        code(snipcheck::unknown_attribute),
        help("known attributes: strict, no-strict, ignore, check-only, diverges")
    )]
    UnknownAttribute {
        file: PathBuf,
        line: usize,
        attribute: String,
    },

    #[error("{}: cannot read document: {reason}", .file.display())]
    #[diagnostic(code(snipcheck::unreadable))]
    Unreadable { file: PathBuf, reason: String },
}

impl ExtractionWarning {
    pub fn file(&self) -> &Path {
        match self {
            ExtractionWarning::UnterminatedFence { file, .. }
            | ExtractionWarning::EmptyBlock { file, .. }
            | ExtractionWarning::ConflictingModes { file, .. }
            | ExtractionWarning::UnknownAttribute { file, .. }
            | ExtractionWarning::Unreadable { file, .. } => file,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            ExtractionWarning::UnterminatedFence { line, .. }
            | ExtractionWarning::EmptyBlock { line, .. }
            | ExtractionWarning::ConflictingModes { line, .. }
            | ExtractionWarning::UnknownAttribute { line, .. } => Some(*line),
            ExtractionWarning::Unreadable { .. } => None,
        }
    }
}

/// Knobs for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Fence languages that produce snippets (compared case-insensitively).
    pub languages: Vec<String>,
    /// Mode used when neither attributes, annotations nor prose decide.
    pub default_mode: CompileMode,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            default_mode: CompileMode::default(),
        }
    }
}

impl ExtractOptions {
    fn accepts(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(language))
    }
}

/// Snippets of one document, in document order, plus the warnings raised along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub snippets: Vec<Snippet>,
    pub warnings: Vec<ExtractionWarning>,
}

/// Extract every target-language fenced block from a markdown document.
#[tracing::instrument(skip_all, fields(file = %path.display(), source_len = source.len()))]
pub fn extract(path: &Path, source: &str, options: &ExtractOptions) -> Extraction {
    let index = LineIndex::new(source);
    let mut extraction = Extraction::default();

    // Prose since the last code block or heading; decides mode and divergence.
    let mut prose = String::new();
    let mut open: Option<OpenBlock> = None;

    for (event, range) in Parser::new_ext(source, Options::empty()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => Some(info.to_string()),
                    CodeBlockKind::Indented => None,
                };
                open = Some(OpenBlock {
                    info,
                    range,
                    body: String::new(),
                });
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = open.take() {
                    finish_block(path, source, &index, options, &prose, block, &mut extraction);
                }
                prose.clear();
            }
            Event::Text(text) => match open.as_mut() {
                Some(block) => block.body.push_str(&text),
                None => prose.push_str(&text),
            },
            Event::Start(Tag::Heading { .. }) => prose.clear(),
            Event::Code(text) if open.is_none() => prose.push_str(&text),
            Event::SoftBreak | Event::HardBreak if open.is_none() => prose.push(' '),
            Event::End(TagEnd::Paragraph) => prose.push(' '),
            _ => {}
        }
    }

    tracing::debug!(
        snippets = extraction.snippets.len(),
        warnings = extraction.warnings.len(),
        "extraction complete"
    );
    extraction
}

struct OpenBlock {
    /// `None` for indented blocks.
    info: Option<String>,
    range: Range<usize>,
    body: String,
}

fn finish_block(
    path: &Path,
    source: &str,
    index: &LineIndex,
    options: &ExtractOptions,
    prose: &str,
    block: OpenBlock,
    extraction: &mut Extraction,
) {
    let Some(info) = block.info else {
        return;
    };
    let fence = FenceInfo::parse(&info);
    if !options.accepts(&fence.language) {
        return;
    }

    let file = path.to_path_buf();
    let line = index.line_of(block.range.start);

    if !fence_is_closed(&source[block.range.clone()]) {
        extraction
            .warnings
            .push(ExtractionWarning::UnterminatedFence { file, line });
        return;
    }
    if block.body.trim().is_empty() {
        extraction.warnings.push(ExtractionWarning::EmptyBlock { file, line });
        return;
    }
    if fence.strict && fence.loose {
        extraction
            .warnings
            .push(ExtractionWarning::ConflictingModes { file, line });
        return;
    }
    for attribute in &fence.unknown {
        extraction.warnings.push(ExtractionWarning::UnknownAttribute {
            file: file.clone(),
            line,
            attribute: attribute.clone(),
        });
    }

    let annotations = annotations::scan(&block.body);
    let (mode, mode_source) = if fence.strict {
        (CompileMode::Strict, ModeSource::Attribute)
    } else if fence.loose {
        (CompileMode::Loose, ModeSource::Attribute)
    } else if annotations.wants_strict() {
        (CompileMode::Strict, ModeSource::Annotation)
    } else if let Some(mode) = mode_from_prose(prose) {
        (mode, ModeSource::Prose)
    } else {
        (options.default_mode, ModeSource::Default)
    };

    let flags = SnippetFlags {
        skip: fence.skip,
        check_only: fence.check_only,
        diverges: fence.diverges || prose_says_divergent(prose),
    };

    let ordinal = extraction.snippets.len();
    extraction.snippets.push(Snippet {
        id: SnippetId::new(file, line, ordinal),
        language: fence.language,
        body: block.body,
        mode,
        mode_source,
        flags,
        expected: annotations.expected,
        errors: annotations.errors,
    });
}

/// Parsed fence info string: ```` ```ts strict,check-only ````.
#[derive(Debug, Default, PartialEq, Eq)]
struct FenceInfo {
    language: String,
    strict: bool,
    loose: bool,
    skip: bool,
    check_only: bool,
    diverges: bool,
    unknown: Vec<String>,
}

impl FenceInfo {
    fn parse(info: &str) -> Self {
        let mut tokens = info
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty());
        let mut fence = FenceInfo {
            language: tokens.next().unwrap_or_default().to_ascii_lowercase(),
            ..FenceInfo::default()
        };

        for token in tokens {
            // Editor metadata such as `{1,3}` or `title="app.ts"`.
            if token.contains(['{', '}', '=', '"']) {
                continue;
            }
            match token.to_ascii_lowercase().as_str() {
                "strict" => fence.strict = true,
                "no-strict" | "nostrict" | "loose" => fence.loose = true,
                "ignore" | "skip" => fence.skip = true,
                "check-only" | "compile-only" | "no-run" | "norun" => fence.check_only = true,
                "diverges" | "divergent" | "no-return" => fence.diverges = true,
                _ => fence.unknown.push(token.to_string()),
            }
        }
        fence
    }
}

/// Check that the raw block text ends with a closing fence matching its opening fence.
fn fence_is_closed(raw: &str) -> bool {
    let mut lines = raw.trim_end().lines();
    let Some(first) = lines.next() else {
        return false;
    };
    let opening = strip_container(first);
    let fence_char = match opening.chars().next() {
        Some(c @ ('`' | '~')) => c,
        // Fences nested in list items etc.; trust the parser.
        _ => return true,
    };
    let open_len = opening.chars().take_while(|&c| c == fence_char).count();

    let Some(last) = lines.last() else {
        return false;
    };
    let closing = strip_container(last).trim_end();
    closing.len() >= open_len && closing.chars().all(|c| c == fence_char)
}

fn strip_container(line: &str) -> &str {
    line.trim_start_matches([' ', '\t', '>'])
}

fn mode_from_prose(prose: &str) -> Option<CompileMode> {
    const LOOSE: &[&str] = &[
        "strictnullchecks: false",
        "strictnullchecks off",
        "strictnullchecks disabled",
        "\"strict\": false",
        "non-strict",
        "without strict",
        "strict mode off",
        "strict mode disabled",
    ];
    const STRICT: &[&str] = &["strict mode", "strictnullchecks", "\"strict\": true", "--strict"];

    let lower = prose.to_ascii_lowercase();
    if LOOSE.iter().any(|p| lower.contains(p)) {
        Some(CompileMode::Loose)
    } else if STRICT.iter().any(|p| lower.contains(p)) {
        Some(CompileMode::Strict)
    } else {
        None
    }
}

fn prose_says_divergent(prose: &str) -> bool {
    const PHRASES: &[&str] = &[
        "infinite loop",
        "never returns",
        "never return",
        "does not return",
        "doesn't return",
        "non-returning",
        "runs forever",
        "never terminates",
    ];
    let lower = prose.to_ascii_lowercase();
    PHRASES.iter().any(|p| lower.contains(p))
}

/// Byte offset to 1-based line lookups.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}
