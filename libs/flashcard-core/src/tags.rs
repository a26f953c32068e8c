//! Tag parsing and sanitization.
//!
//! Sanitized tags contain no whitespace, colons, semicolons or HTML-like
//! markup, and never begin with a digit.

use regex::Regex;
use std::sync::LazyLock;

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Sanitize a single tag. Returns `None` when nothing usable remains.
pub fn sanitize_tag(tag: &str) -> Option<String> {
    let stripped = HTML_TAG_RE.replace_all(tag.trim(), "");

    let mut clean: String = stripped
        .chars()
        .map(|c| match c {
            ':' | ',' | ';' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if clean.is_empty() {
        return None;
    }
    if clean.starts_with(|c: char| c.is_ascii_digit()) {
        clean.insert_str(0, "tag_");
    }
    Some(clean)
}

/// Split a comma-separated tag string into sanitized tags.
pub fn parse_tags(tag_string: &str) -> Vec<String> {
    tag_string.split(',').filter_map(sanitize_tag).collect()
}

/// Deck-wide tags followed by card tags, first occurrence kept.
pub fn merge_tags(global: &[String], card: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(global.len() + card.len());
    for tag in global.iter().chain(card) {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}
