//! Card validation and auto-correction.
//!
//! Each raw block is normalized to a closed card type, checked against that
//! type's required fields, and repaired where a common authoring slip can be
//! fixed unambiguously. The result is either a typed [`Card`] together with the
//! corrections applied, or a [`RejectionReason`].

use crate::error::RejectionReason;
use crate::markdown::protected_spans;
use crate::tags::parse_tags;
use crate::types::{bool_label, Card, CardContent, CardType, MaskedArea, RawCard, TextField};
use regex::{Captures, Regex};
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

/// Canonical fill-in-the-blank token.
pub const BLANK: &str = "_____";

static CLOZE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{\{.+?\}\}").unwrap());
// Group 2 catches a following `(` so links and images can be left alone.
static SQUARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]\n]+)\](\()?").unwrap());
static SINGLE_BRACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}\n]+)\}").unwrap());
/// Bracketed LaTeX delimiters, never cloze candidates.
const LATEX_TAGS: [&str; 6] = ["latex", "/latex", "$", "/$", "$$", "/$$"];

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)\s]+[^)]*\)").unwrap());

/// A repair applied to a card during validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Correction {
    TypeNormalized { from: String, to: CardType },
    ClozeFromSquareBrackets,
    ClozeFromSingleBraces,
    OptionsFromBack,
    DefaultCorrectAnswer { chosen: String },
    CorrectAnswerMatched { given: String, matched: String },
    BlankNormalized { run_length: usize },
    BooleanAnswer { given: String, normalized: &'static str },
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeNormalized { from, to } => write!(f, "type {from:?} normalized to {to}"),
            Self::ClozeFromSquareBrackets => f.write_str("[text] converted to {{text}}"),
            Self::ClozeFromSingleBraces => f.write_str("{text} converted to {{text}}"),
            Self::OptionsFromBack => f.write_str("options recovered from back"),
            Self::DefaultCorrectAnswer { chosen } => {
                write!(f, "correct answer defaulted to first option {chosen:?}")
            }
            Self::CorrectAnswerMatched { given, matched } => {
                write!(f, "correct answer {given:?} matched option {matched:?}")
            }
            Self::BlankNormalized { run_length } => {
                write!(f, "{run_length}-underscore blanks normalized to {BLANK}")
            }
            Self::BooleanAnswer { given, normalized } => {
                write!(f, "answer {given:?} normalized to {normalized}")
            }
        }
    }
}

/// An accepted card and what was repaired to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub card: Card,
    pub corrections: Vec<Correction>,
}

impl Validated {
    pub fn was_corrected(&self) -> bool {
        !self.corrections.is_empty()
    }
}

/// Validate one raw block.
pub fn validate(raw: &RawCard) -> Result<Validated, RejectionReason> {
    let mut corrections = Vec::new();

    let tag = CardType::normalize(raw.card_type.as_deref());
    if let Some(from) = tag.rewritten_from {
        corrections.push(Correction::TypeNormalized {
            from,
            to: tag.card_type,
        });
    }
    let card_type = tag.card_type;

    let content = match card_type {
        CardType::Basic
        | CardType::Reversed
        | CardType::BasicAndReversed
        | CardType::Math
        | CardType::Spelling
        | CardType::Timeline
        | CardType::Matching
        | CardType::Ordering
        | CardType::ShortAnswer => CardContent::Basic {
            front: required(raw, TextField::Front)?,
            back: required(raw, TextField::Back)?,
        },
        CardType::Cloze => validate_cloze(raw, &mut corrections)?,
        CardType::MultipleChoice => validate_multiple_choice(raw, &mut corrections)?,
        CardType::TrueFalse => validate_true_false(raw, &mut corrections)?,
        CardType::ImageOcclusion => validate_image_occlusion(raw)?,
        CardType::FillInTheBlank => validate_fill_in_blank(raw, &mut corrections)?,
        CardType::Audio => CardContent::Audio {
            front: required(raw, TextField::Front)?,
            back: optional(raw, TextField::Back),
            audio: Some(optional(raw, TextField::Audio)).filter(|a| !a.is_empty()),
        },
    };

    let category = optional(raw, TextField::Tags);
    let card = Card {
        card_type,
        tags: parse_tags(&category),
        category,
        content,
        line_number: raw.line_number,
    };

    Ok(Validated { card, corrections })
}

fn required(raw: &RawCard, field: TextField) -> Result<String, RejectionReason> {
    let value = raw.text(field).trim();
    if value.is_empty() {
        return Err(RejectionReason::MissingField(field.name()));
    }
    Ok(value.to_string())
}

fn optional(raw: &RawCard, field: TextField) -> String {
    raw.text(field).trim().to_string()
}

/// Cloze markers outside math and code.
fn has_cloze(text: &str) -> bool {
    let spans = protected_spans(text);
    CLOZE_RE
        .find_iter(text)
        .any(|m| !in_spans(&spans, m.start()))
}

fn in_spans(spans: &[Range<usize>], pos: usize) -> bool {
    spans.iter().any(|span| span.contains(&pos))
}

fn validate_cloze(
    raw: &RawCard,
    corrections: &mut Vec<Correction>,
) -> Result<CardContent, RejectionReason> {
    let mut text = required(raw, TextField::Front)?;

    if !has_cloze(&text) {
        if let Some(fixed) = square_brackets_to_cloze(&text) {
            text = fixed;
            corrections.push(Correction::ClozeFromSquareBrackets);
        } else if let Some(fixed) = single_braces_to_cloze(&text) {
            text = fixed;
            corrections.push(Correction::ClozeFromSingleBraces);
        }
    }

    if !has_cloze(&text) {
        return Err(RejectionReason::NoClozeMarkers);
    }

    Ok(CardContent::Cloze {
        text,
        extra: optional(raw, TextField::Back),
    })
}

/// `[text]` to `{{text}}`, skipping links, images, sound references, LaTeX
/// delimiters and anything inside math or code.
fn square_brackets_to_cloze(text: &str) -> Option<String> {
    let spans = protected_spans(text);
    let mut converted = false;
    let out = SQUARE_RE.replace_all(text, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let inner = &caps[1];
        let start = caps.get(0).map(|m| m.start()).unwrap_or_default();
        let is_link = caps.get(2).is_some();
        let is_media = inner.starts_with("sound:") || inner.starts_with("audio:");
        let is_image_alt = text[..start].ends_with('!');
        if is_link
            || is_media
            || is_image_alt
            || LATEX_TAGS.contains(&inner)
            || in_spans(&spans, start)
        {
            return whole.to_string();
        }
        converted = true;
        format!("{{{{{inner}}}}}")
    });
    converted.then(|| out.into_owned())
}

/// `{text}` to `{{text}}`, leaving math and code alone.
fn single_braces_to_cloze(text: &str) -> Option<String> {
    let spans = protected_spans(text);
    let mut converted = false;
    let out = SINGLE_BRACE_RE.replace_all(text, |caps: &Captures<'_>| {
        let start = caps.get(0).map(|m| m.start()).unwrap_or_default();
        if in_spans(&spans, start) {
            return caps[0].to_string();
        }
        converted = true;
        format!("{{{{{}}}}}", &caps[1])
    });
    converted.then(|| out.into_owned())
}

fn validate_multiple_choice(
    raw: &RawCard,
    corrections: &mut Vec<Correction>,
) -> Result<CardContent, RejectionReason> {
    let question = required(raw, TextField::Front)?;
    let mut explanation = optional(raw, TextField::Back);

    let mut options: Vec<String> = raw
        .options
        .iter()
        .flatten()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    let mut given = Some(raw.text(TextField::CorrectAnswer).trim().to_string())
        .filter(|a| !a.is_empty());

    if options.is_empty() && !explanation.is_empty() {
        let (recovered, marked) = options_from_back(&explanation);
        if !recovered.is_empty() {
            options = recovered;
            given = given.or(marked);
            explanation.clear();
            corrections.push(Correction::OptionsFromBack);
        }
    }

    if options.len() < 2 {
        return Err(RejectionReason::TooFewOptions {
            found: options.len(),
        });
    }

    let correct_answer = match given {
        None => {
            let chosen = options[0].clone();
            corrections.push(Correction::DefaultCorrectAnswer {
                chosen: chosen.clone(),
            });
            chosen
        }
        Some(given) => {
            let matched = match_option(&options, &given)
                .ok_or_else(|| RejectionReason::UnmatchedCorrectAnswer {
                    given: given.clone(),
                })?
                .to_string();
            if matched != given {
                corrections.push(Correction::CorrectAnswerMatched {
                    given,
                    matched: matched.clone(),
                });
            }
            matched
        }
    };

    Ok(CardContent::MultipleChoice {
        question,
        options,
        correct_answer,
        explanation,
    })
}

/// One option per non-empty line; `*` or `- [x]` marks the correct one.
fn options_from_back(back: &str) -> (Vec<String>, Option<String>) {
    let mut options = Vec::new();
    let mut marked = None;

    for line in back.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (option, is_marked) = if let Some(rest) = line
            .strip_prefix("- [x]")
            .or_else(|| line.strip_prefix("- [X]"))
        {
            (rest, true)
        } else if let Some(rest) = line.strip_prefix("- [ ]") {
            (rest, false)
        } else if let Some(rest) = line.strip_prefix('*') {
            (rest, true)
        } else if let Some(rest) = line.strip_prefix("- ") {
            (rest, false)
        } else {
            (line, false)
        };

        let option = option.trim();
        if option.is_empty() {
            continue;
        }
        if is_marked && marked.is_none() {
            marked = Some(option.to_string());
        }
        options.push(option.to_string());
    }

    (options, marked)
}

/// Exact match, then case-insensitive, then first option containing the
/// answer (or contained by it).
fn match_option<'a>(options: &'a [String], given: &str) -> Option<&'a str> {
    if let Some(exact) = options.iter().find(|o| o.as_str() == given) {
        return Some(exact);
    }

    let given_lower = given.to_lowercase();
    options
        .iter()
        .find(|o| o.to_lowercase() == given_lower)
        .or_else(|| {
            options.iter().find(|o| {
                let lower = o.to_lowercase();
                lower.contains(&given_lower) || given_lower.contains(&lower)
            })
        })
        .map(String::as_str)
}

fn validate_true_false(
    raw: &RawCard,
    corrections: &mut Vec<Correction>,
) -> Result<CardContent, RejectionReason> {
    let statement = required(raw, TextField::Front)?;
    let explanation = optional(raw, TextField::Back);

    let given = match raw.text(TextField::CorrectAnswer).trim() {
        "" => first_word(&explanation)
            .ok_or(RejectionReason::MissingField(TextField::CorrectAnswer.name()))?,
        given => given.to_string(),
    };

    let answer = parse_boolean(&given).ok_or_else(|| RejectionReason::NotBoolean {
        given: given.clone(),
    })?;
    let normalized = bool_label(answer);
    if given != normalized {
        corrections.push(Correction::BooleanAnswer { given, normalized });
    }

    Ok(CardContent::TrueFalse {
        statement,
        answer,
        explanation,
    })
}

fn first_word(text: &str) -> Option<String> {
    text.split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
}

/// Boolean-like tokens, case-insensitive.
pub fn parse_boolean(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn validate_image_occlusion(raw: &RawCard) -> Result<CardContent, RejectionReason> {
    let front = required(raw, TextField::Front)?;
    if !IMAGE_RE.is_match(&front) {
        return Err(RejectionReason::MissingImage);
    }

    let entries = raw.masked_areas.as_deref().unwrap_or_default();
    if entries.is_empty() {
        return Err(RejectionReason::MissingMaskedAreas);
    }
    let masked_areas = entries
        .iter()
        .map(|entry| {
            entry
                .parse::<MaskedArea>()
                .map_err(|_| RejectionReason::InvalidMaskedArea {
                    entry: entry.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CardContent::ImageOcclusion {
        front,
        masked_areas,
        back: optional(raw, TextField::Back),
    })
}

fn validate_fill_in_blank(
    raw: &RawCard,
    corrections: &mut Vec<Correction>,
) -> Result<CardContent, RejectionReason> {
    let mut front = required(raw, TextField::Front)?;
    let back = required(raw, TextField::Back)?;

    if let Some((fixed, run_length)) = collapse_long_blanks(&front) {
        front = fixed;
        corrections.push(Correction::BlankNormalized { run_length });
    }
    if !front.contains(BLANK) {
        if let Some((fixed, run_length)) = normalize_blanks(&front) {
            front = fixed;
            corrections.push(Correction::BlankNormalized { run_length });
        }
    }
    if !front.contains(BLANK) {
        return Err(RejectionReason::MissingBlank);
    }

    let answers = raw
        .answers
        .clone()
        .unwrap_or_else(|| back.split(',').map(|a| a.trim().to_string()).collect());

    Ok(CardContent::FillInTheBlank {
        front,
        back,
        answers,
    })
}

/// Rewrite underscore runs into [`BLANK`].
///
/// Run lengths are tried in priority order (3 or 4, then 2, then 1) and only
/// the first class present is rewritten. Returns the shortest run length of
/// the rewritten class.
pub fn normalize_blanks(text: &str) -> Option<(String, usize)> {
    let runs = underscore_runs(text);
    let class: &[usize] = [&[3usize, 4][..], &[2][..], &[1][..]]
        .into_iter()
        .find(|class| runs.iter().any(|(_, len)| class.contains(len)))?;

    Some((rewrite_runs(text, &runs, |len| class.contains(&len)), class[0]))
}

/// Shorten runs longer than [`BLANK`] to exactly [`BLANK`]. Returns the
/// longest run rewritten.
pub fn collapse_long_blanks(text: &str) -> Option<(String, usize)> {
    let runs = underscore_runs(text);
    let longest = runs
        .iter()
        .map(|(_, len)| *len)
        .filter(|len| *len > BLANK.len())
        .max()?;

    Some((rewrite_runs(text, &runs, |len| len > BLANK.len()), longest))
}

fn rewrite_runs(text: &str, runs: &[(usize, usize)], matches: impl Fn(usize) -> bool) -> String {
    let mut out = String::with_capacity(text.len() + runs.len() * 4);
    let mut cursor = 0;
    for &(start, len) in runs.iter().filter(|(_, len)| matches(*len)) {
        out.push_str(&text[cursor..start]);
        out.push_str(BLANK);
        cursor = start + len;
    }
    out.push_str(&text[cursor..]);
    out
}

/// (byte offset, length) of each maximal `_` run.
fn underscore_runs(text: &str) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    for (idx, byte) in text.bytes().enumerate() {
        if byte != b'_' {
            runs.extend(current.take());
        } else if let Some((_, len)) = current.as_mut() {
            *len += 1;
        } else {
            current = Some((idx, 1));
        }
    }
    runs.extend(current);
    runs
}
