//! Card block extractor.
//!
//! # Format
//! ```markdown
//! <!-- Anki Card -->
//! <!-- type: multiple-choice -->
//! <!-- front -->
//! What is the capital of France?
//! <!-- options -->
//! Paris <!-- correct -->
//! London
//! <!-- back -->
//! Paris has been the capital since 987.
//! <!-- tags: geography, europe -->
//! ```
//!
//! A field spans from its marker to the next recognized marker or the end of
//! the block. Extraction never fails: a missing marker leaves the field unset
//! and validation decides what that means.

use crate::types::{CardType, RawCard};
use regex::Regex;
use std::sync::LazyLock;

/// Separator between card blocks.
pub const CARD_DELIMITER: &str = "<!-- Anki Card -->";

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--\s*(.*?)\s*-->").unwrap());
static CORRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!--\s*correct\s*-->").unwrap());

#[derive(Debug, Clone, Copy, PartialEq)]
enum Region {
    Front,
    Back,
    Options,
    MaskedAreas,
}

#[derive(Debug, PartialEq)]
enum Marker<'a> {
    Type(&'a str),
    Tags(&'a str),
    Audio(&'a str),
    Open(Region),
}

impl<'a> Marker<'a> {
    fn classify(inner: &'a str) -> Option<Self> {
        if let Some(value) = strip_prefix_ci(inner, "type:") {
            return Some(Self::Type(value.trim()));
        }
        if let Some(value) = strip_prefix_ci(inner, "tags:") {
            return Some(Self::Tags(value.trim()));
        }
        if let Some(value) = strip_prefix_ci(inner, "audio:") {
            return Some(Self::Audio(value.trim()));
        }

        let region = match inner.to_lowercase().as_str() {
            "front" => Region::Front,
            "back" => Region::Back,
            "options" => Region::Options,
            "masked-areas" | "masked areas" | "masked_areas" => Region::MaskedAreas,
            _ => return None,
        };
        Some(Self::Open(region))
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Split note text into raw card blocks, in source order.
pub fn parse(content: &str) -> Vec<RawCard> {
    let mut cards = Vec::new();
    let mut offset = 0;

    for segment in content.split(CARD_DELIMITER) {
        let segment_start = offset;
        offset += segment.len() + CARD_DELIMITER.len();

        if segment.trim().is_empty() {
            continue;
        }

        let leading = segment.len() - segment.trim_start().len();
        let line_number = line_at(content, segment_start + leading);

        let card = parse_block(segment, line_number);
        if card.has_fields() {
            cards.push(card);
        }
    }

    cards
}

/// 1-based line number of a byte offset.
fn line_at(content: &str, byte_offset: usize) -> usize {
    content[..byte_offset].matches('\n').count() + 1
}

fn parse_block(block: &str, line_number: usize) -> RawCard {
    let mut card = RawCard {
        line_number,
        ..RawCard::default()
    };

    // (start, end, marker) for every recognized marker; `correct` is inline
    // content, not a field boundary, so it is not collected here.
    let markers: Vec<(usize, usize, Marker<'_>)> = MARKER_RE
        .captures_iter(block)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?.as_str();
            Marker::classify(inner).map(|m| (whole.start(), whole.end(), m))
        })
        .collect();

    for (idx, (_, end, marker)) in markers.iter().enumerate() {
        match marker {
            Marker::Type(value) => {
                card.card_type.get_or_insert_with(|| value.to_string());
            }
            Marker::Tags(value) => {
                card.tags.get_or_insert_with(|| value.to_string());
            }
            Marker::Audio(value) => {
                card.audio.get_or_insert_with(|| value.to_string());
            }
            Marker::Open(region) => {
                let stop = markers
                    .get(idx + 1)
                    .map(|(start, _, _)| *start)
                    .unwrap_or(block.len());
                let body = block[*end..stop].trim();
                fill_region(&mut card, *region, body);
            }
        }
    }

    if CardType::normalize(card.card_type.as_deref()).card_type == CardType::FillInTheBlank {
        card.answers = card
            .back
            .as_deref()
            .map(|back| back.split(',').map(|a| a.trim().to_string()).collect());
    }

    card
}

fn fill_region(card: &mut RawCard, region: Region, body: &str) {
    match region {
        Region::Front => {
            card.front.get_or_insert_with(|| body.to_string());
        }
        Region::Back => {
            card.back.get_or_insert_with(|| body.to_string());
        }
        Region::Options => {
            if card.options.is_some() {
                return;
            }
            let mut options = Vec::new();
            for line in body.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let option = CORRECT_RE.replace_all(line, "").trim().to_string();
                if CORRECT_RE.is_match(line) && card.correct_answer.is_none() {
                    card.correct_answer = Some(option.clone());
                }
                options.push(option);
            }
            card.options = Some(options);
        }
        Region::MaskedAreas => {
            card.masked_areas.get_or_insert_with(|| {
                body.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            });
        }
    }
}
