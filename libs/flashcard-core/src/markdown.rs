//! Markdown and LaTeX to HTML conversion.

use crate::error::RenderError;
use pulldown_cmark::{html, Options, Parser};
use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::LazyLock;

/// Converts authored card text into an HTML fragment.
pub trait MarkupConverter {
    fn convert(&self, text: &str) -> Result<String, RenderError>;
}

/// CommonMark converter that leaves LaTeX untouched for MathJax.
///
/// Math spans are lifted out before Markdown runs so emphasis and escapes
/// cannot mangle them, then restored with MathJax delimiters: `$$…$$`,
/// `[latex]…[/latex]` and `[$$]…[/$$]` become `\[…\]`; `$…$` and `[$]…[/$]`
/// become `\(…\)`. Code spans and fenced blocks are left as written.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownConverter;

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```|`[^`\n]+`").unwrap());
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{E000}(\d+)\x{E001}").unwrap());

/// (pattern, display math) in the order they must be applied.
static MATH_PATTERNS: LazyLock<Vec<(Regex, bool)>> = LazyLock::new(|| {
    [
        (r"(?s)\[latex\](.*?)\[/latex\]", true),
        (r"(?s)\[\$\$\](.*?)\[/\$\$\]", true),
        (r"(?s)\[\$\](.*?)\[/\$\]", false),
        (r"(?s)\$\$(.+?)\$\$", true),
        (r"\$([^$\n]+?)\$", false),
    ]
    .into_iter()
    .map(|(pattern, display)| (Regex::new(pattern).unwrap(), display))
    .collect()
});

impl MarkupConverter for MarkdownConverter {
    fn convert(&self, text: &str) -> Result<String, RenderError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let mut math = Vec::new();
        let protected = protect_math(text, &mut math);

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut out = String::with_capacity(protected.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(&protected, options));

        let restored = PLACEHOLDER_RE.replace_all(out.trim_end(), |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|idx| math.get(idx))
                .map(|m| escape_html(m))
                .unwrap_or_default()
        });
        Ok(restored.into_owned())
    }
}

fn protect_math(text: &str, math: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for code in CODE_RE.find_iter(text) {
        out.push_str(&protect_segment(&text[cursor..code.start()], math));
        out.push_str(code.as_str());
        cursor = code.end();
    }
    out.push_str(&protect_segment(&text[cursor..], math));
    out
}

fn protect_segment(segment: &str, math: &mut Vec<String>) -> String {
    let mut current = segment.to_string();
    for (re, display) in MATH_PATTERNS.iter() {
        current = re
            .replace_all(&current, |caps: &Captures<'_>| {
                let body = &caps[1];
                let delimited = if *display {
                    format!("\\[{body}\\]")
                } else {
                    format!("\\({body}\\)")
                };
                math.push(delimited);
                format!("\u{E000}{}\u{E001}", math.len() - 1)
            })
            .into_owned();
    }
    current
}

/// Byte ranges of code spans and math spans in `text`.
///
/// Rewrites of authored text must leave these ranges as written. Ranges may
/// overlap.
pub fn protected_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = CODE_RE.find_iter(text).map(|m| m.range()).collect();
    for (re, _) in MATH_PATTERNS.iter() {
        spans.extend(re.find_iter(text).map(|m| m.range()));
    }
    spans
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
