//! Core types for the note-to-card pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Card type tag. The set is closed; anything unrecognized becomes `Basic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardType {
    Basic,
    Reversed,
    BasicAndReversed,
    Cloze,
    MultipleChoice,
    TrueFalse,
    ImageOcclusion,
    FillInTheBlank,
    Audio,
    Math,
    Spelling,
    Timeline,
    Matching,
    Ordering,
    ShortAnswer,
}

impl Default for CardType {
    fn default() -> Self {
        Self::Basic
    }
}

impl CardType {
    pub const ALL: [CardType; 15] = [
        Self::Basic,
        Self::Reversed,
        Self::BasicAndReversed,
        Self::Cloze,
        Self::MultipleChoice,
        Self::TrueFalse,
        Self::ImageOcclusion,
        Self::FillInTheBlank,
        Self::Audio,
        Self::Math,
        Self::Spelling,
        Self::Timeline,
        Self::Matching,
        Self::Ordering,
        Self::ShortAnswer,
    ];

    /// Canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Reversed => "reversed",
            Self::BasicAndReversed => "basic-and-reversed",
            Self::Cloze => "cloze",
            Self::MultipleChoice => "multiple-choice",
            Self::TrueFalse => "true-false",
            Self::ImageOcclusion => "image-occlusion",
            Self::FillInTheBlank => "fill-in-the-blank",
            Self::Audio => "audio",
            Self::Math => "math",
            Self::Spelling => "spelling",
            Self::Timeline => "timeline",
            Self::Matching => "matching",
            Self::Ordering => "ordering",
            Self::ShortAnswer => "short-answer",
        }
    }

    /// Normalize a raw type tag.
    ///
    /// Missing tags default to `basic`. Spacing and punctuation variants
    /// (`multiple choice`, `true/false`, `fill_in_blank`, ...) collapse onto
    /// the canonical token; unknown tokens degrade to `basic`.
    pub fn normalize(raw: Option<&str>) -> TypeTag {
        let Some(raw) = raw else {
            return TypeTag {
                card_type: Self::Basic,
                rewritten_from: None,
            };
        };

        let lowered = raw.trim().to_lowercase();
        let card_type = lookup_synonym(&collapse_separators(&lowered)).unwrap_or(Self::Basic);
        let rewritten_from = (card_type.as_str() != lowered).then(|| raw.trim().to_string());

        TypeTag {
            card_type,
            rewritten_from,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardType {
    type Err = String;

    /// Parse a canonical token exactly. Use [`CardType::normalize`] for author input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown card type: {s}"))
    }
}

/// Outcome of type normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTag {
    pub card_type: CardType,
    /// The author's tag when it differed from the canonical token.
    pub rewritten_from: Option<String>,
}

fn collapse_separators(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars() {
        let c = if c.is_whitespace() || c == '_' || c == '/' { '-' } else { c };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    out.trim_end_matches('-').to_string()
}

fn lookup_synonym(token: &str) -> Option<CardType> {
    let card_type = match token {
        "mcq" | "multiplechoice" | "multiple-choice-question" => CardType::MultipleChoice,
        "truefalse" | "true-or-false" | "tf" => CardType::TrueFalse,
        "fill-in-blank" | "fill-in-the-blanks" | "fillintheblank" | "fill-blank" | "fillblank" => {
            CardType::FillInTheBlank
        }
        "imageocclusion" | "occlusion" => CardType::ImageOcclusion,
        "basic-reversed" | "basicandreversed" => CardType::BasicAndReversed,
        "shortanswer" => CardType::ShortAnswer,
        other => return other.parse().ok(),
    };
    Some(card_type)
}

/// Text fields of a raw card block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Type,
    Front,
    Back,
    CorrectAnswer,
    Tags,
    Audio,
}

impl TextField {
    /// What an absent field means.
    pub fn default_value(&self) -> &'static str {
        match self {
            Self::Type => "basic",
            _ => "",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Front => "front",
            Self::Back => "back",
            Self::CorrectAnswer => "correct answer",
            Self::Tags => "tags",
            Self::Audio => "audio",
        }
    }
}

/// Untyped card block as extracted from the note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCard {
    pub card_type: Option<String>,
    pub front: Option<String>,
    pub back: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub masked_areas: Option<Vec<String>>,
    pub tags: Option<String>,
    pub audio: Option<String>,
    /// Comma-split `back` of fill-in-the-blank blocks. Best effort only.
    pub answers: Option<Vec<String>>,
    pub line_number: usize,
}

impl RawCard {
    /// Value of a text field, or the field's declared default.
    pub fn text(&self, field: TextField) -> &str {
        let value = match field {
            TextField::Type => &self.card_type,
            TextField::Front => &self.front,
            TextField::Back => &self.back,
            TextField::CorrectAnswer => &self.correct_answer,
            TextField::Tags => &self.tags,
            TextField::Audio => &self.audio,
        };
        value.as_deref().unwrap_or(field.default_value())
    }

    /// Whether any field was extracted at all.
    pub fn has_fields(&self) -> bool {
        self.card_type.is_some()
            || self.front.is_some()
            || self.back.is_some()
            || self.options.is_some()
            || self.correct_answer.is_some()
            || self.masked_areas.is_some()
            || self.tags.is_some()
            || self.audio.is_some()
    }
}

/// Rectangle hidden over an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskedArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl FromStr for MaskedArea {
    type Err = String;

    /// Parse `[left, top, width, height]`; brackets optional, commas and/or spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
        let values = inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<f64>().map_err(|_| format!("not a number: {part}")))
            .collect::<Result<Vec<_>, _>>()?;

        let &[left, top, width, height] = values.as_slice() else {
            return Err(format!("expected 4 values, found {}", values.len()));
        };
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err("values must be non-negative".to_string());
        }

        Ok(Self {
            left,
            top,
            width,
            height,
        })
    }
}

/// Validated card content, one variant per rendering shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CardContent {
    /// Basic, reversed and the catch-all academic types.
    Basic { front: String, back: String },
    Cloze { text: String, extra: String },
    MultipleChoice {
        question: String,
        options: Vec<String>,
        correct_answer: String,
        explanation: String,
    },
    TrueFalse {
        statement: String,
        answer: bool,
        explanation: String,
    },
    ImageOcclusion {
        front: String,
        masked_areas: Vec<MaskedArea>,
        back: String,
    },
    FillInTheBlank {
        front: String,
        back: String,
        answers: Vec<String>,
    },
    Audio {
        front: String,
        back: String,
        audio: Option<String>,
    },
}

/// Card accepted by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub card_type: CardType,
    /// Free-text label shown with the card.
    pub category: String,
    /// Sanitized per-card tags, merged with the deck tags at render time.
    pub tags: Vec<String>,
    pub content: CardContent,
    pub line_number: usize,
}

impl Card {
    pub fn front(&self) -> &str {
        match &self.content {
            CardContent::Basic { front, .. }
            | CardContent::ImageOcclusion { front, .. }
            | CardContent::FillInTheBlank { front, .. }
            | CardContent::Audio { front, .. } => front,
            CardContent::Cloze { text, .. } => text,
            CardContent::MultipleChoice { question, .. } => question,
            CardContent::TrueFalse { statement, .. } => statement,
        }
    }

    pub fn back(&self) -> &str {
        match &self.content {
            CardContent::Basic { back, .. }
            | CardContent::ImageOcclusion { back, .. }
            | CardContent::FillInTheBlank { back, .. }
            | CardContent::Audio { back, .. } => back,
            CardContent::Cloze { extra, .. } => extra,
            CardContent::MultipleChoice { explanation, .. }
            | CardContent::TrueFalse { explanation, .. } => explanation,
        }
    }

    pub fn options(&self) -> &[String] {
        match &self.content {
            CardContent::MultipleChoice { options, .. } => options,
            _ => &[],
        }
    }

    /// `correct_answer` for multiple-choice and true-false cards.
    pub fn correct_answer(&self) -> Option<&str> {
        match &self.content {
            CardContent::MultipleChoice { correct_answer, .. } => Some(correct_answer),
            CardContent::TrueFalse { answer, .. } => Some(bool_label(*answer)),
            _ => None,
        }
    }
}

/// Canonical true-false label.
pub fn bool_label(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
