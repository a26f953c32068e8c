//! Render dispatcher.
//!
//! Maps each validated card to a rendering strategy by type and produces the
//! note fields the packaging layer expects. Failures are contained per card:
//! a handler error falls back to a plain-text note, and only if that also
//! fails is the card skipped.

use crate::error::RenderError;
use crate::markdown::{escape_html, MarkupConverter};
use crate::tags::merge_tags;
use crate::types::{bool_label, Card, CardContent, CardType, MaskedArea};
use crate::validator::BLANK;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use std::ops::Range;
use std::sync::LazyLock;

static NUMBERED_CLOZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{c\d+::").unwrap());
static BARE_CLOZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.+?)\}\}").unwrap());
static AUDIO_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?:audio|sound):([^\]]+)\]").unwrap());

/// Field layout a note is packaged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteModel {
    Basic,
    Cloze,
    MultipleChoice,
}

impl NoteModel {
    pub const ALL: [NoteModel; 3] = [Self::Basic, Self::Cloze, Self::MultipleChoice];

    pub fn for_type(card_type: CardType) -> Self {
        match card_type {
            CardType::Cloze | CardType::FillInTheBlank => Self::Cloze,
            CardType::MultipleChoice => Self::MultipleChoice,
            _ => Self::Basic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Basic => "Basic Card",
            Self::Cloze => "Cloze Card",
            Self::MultipleChoice => "Multiple Choice Card",
        }
    }

    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            Self::Basic => &["Category", "Front", "Back", "UseScript"],
            Self::Cloze => &["Text", "Back", "Category"],
            Self::MultipleChoice => &["Category", "Question", "Options", "Answer", "UseScript"],
        }
    }
}

/// Client-side interaction attached to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Highlight the picked option and lock the rest.
    MultipleChoiceSelection,
    /// Highlight the correct button and a wrong pick.
    TrueFalseSelection,
}

impl Behavior {
    pub fn script(&self) -> &'static str {
        match self {
            Self::MultipleChoiceSelection => MCQ_SCRIPT,
            Self::TrueFalseSelection => TRUE_FALSE_SCRIPT,
        }
    }
}

const MCQ_SCRIPT: &str = r#"function checkMCQAnswer(element, isCorrect) {
  element.classList.add(isCorrect ? 'opt-correct' : 'opt-incorrect');
  element.setAttribute('data-revealed', 'true');
  var icon = element.querySelector('.mcq-result-icon');
  if (icon) { icon.textContent = isCorrect ? '✓' : '✗'; }
  var options = document.querySelectorAll('.mcq-option');
  for (var i = 0; i < options.length; i++) {
    options[i].onclick = null;
    if (options[i] !== element) { options[i].style.opacity = '0.6'; }
  }
}"#;

const TRUE_FALSE_SCRIPT: &str = r#"(function () {
  var buttons = document.querySelectorAll('.tf-button');
  function check(selected) {
    for (var i = 0; i < buttons.length; i++) {
      var btn = buttons[i];
      btn.style.pointerEvents = 'none';
      if (btn.getAttribute('data-correct') === 'true') {
        btn.classList.add('opt-correct');
      } else if (btn === selected) {
        btn.classList.add('opt-incorrect');
      }
    }
  }
  for (var i = 0; i < buttons.length; i++) {
    buttons[i].addEventListener('click', function () { check(this); });
  }
})();"#;

/// Rendered fields, shaped by model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum NoteFields {
    Basic {
        category: String,
        front: String,
        back: String,
        behavior: Option<Behavior>,
    },
    Cloze {
        text: String,
        extra: String,
        category: String,
    },
    MultipleChoice {
        category: String,
        question: String,
        options: String,
        answer: String,
        behavior: Behavior,
    },
}

impl NoteFields {
    pub fn model(&self) -> NoteModel {
        match self {
            Self::Basic { .. } => NoteModel::Basic,
            Self::Cloze { .. } => NoteModel::Cloze,
            Self::MultipleChoice { .. } => NoteModel::MultipleChoice,
        }
    }

    /// Field values in [`NoteModel::field_names`] order.
    pub fn values(&self) -> Vec<String> {
        let script = |b: &Option<Behavior>| b.map(|b| b.script().to_string()).unwrap_or_default();
        match self {
            Self::Basic {
                category,
                front,
                back,
                behavior,
            } => vec![category.clone(), front.clone(), back.clone(), script(behavior)],
            Self::Cloze {
                text,
                extra,
                category,
            } => vec![text.clone(), extra.clone(), category.clone()],
            Self::MultipleChoice {
                category,
                question,
                options,
                answer,
                behavior,
            } => vec![
                category.clone(),
                question.clone(),
                options.clone(),
                answer.clone(),
                behavior.script().to_string(),
            ],
        }
    }
}

/// A card ready for packaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedNote {
    pub card_type: CardType,
    pub fields: NoteFields,
    pub tags: Vec<String>,
    /// Built by the plain-text fallback rather than the type's handler.
    pub fallback: bool,
}

/// Counters for one dispatcher run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderStats {
    pub rendered: usize,
    pub duplicates: usize,
    pub fallbacks: usize,
    pub failures: usize,
    pub by_type: BTreeMap<CardType, usize>,
}

/// Handlers get the converter, the card and its merged tag list.
type Handler<C> = fn(&C, &Card, &[String]) -> Result<NoteFields, RenderError>;

/// Dispatches validated cards to per-type handlers.
///
/// Fingerprint and counter state belong to one run; use a fresh dispatcher
/// per deck.
pub struct Renderer<C> {
    converter: C,
    dedupe: bool,
    seen: HashSet<String>,
    stats: RenderStats,
}

impl<C: MarkupConverter> Renderer<C> {
    pub fn new(converter: C) -> Self {
        Self {
            converter,
            dedupe: true,
            seen: HashSet::new(),
            stats: RenderStats::default(),
        }
    }

    /// Toggle exact-content duplicate suppression (on by default).
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn into_stats(self) -> RenderStats {
        self.stats
    }

    /// Render one card. `None` means the card is skipped.
    pub fn render(&mut self, index: usize, card: &Card, global_tags: &[String]) -> Option<RenderedNote> {
        let card_type = card.card_type;

        if self.dedupe && !self.seen.insert(fingerprint(card)) {
            tracing::warn!(card = index, card_type = %card_type, "skipping duplicate card");
            self.stats.duplicates += 1;
            return None;
        }

        let tags = merge_tags(global_tags, &card.tags);
        let handler: Handler<C> = handler_for(card_type);
        let (fields, fallback) = match handler(&self.converter, card, &tags) {
            Ok(fields) => (fields, false),
            Err(err) => {
                tracing::warn!(card = index, card_type = %card_type, error = %err, "handler failed, using plain-text fallback");
                match plain_fallback(card) {
                    Ok(fields) => {
                        self.stats.fallbacks += 1;
                        (fields, true)
                    }
                    Err(err) => {
                        tracing::error!(card = index, card_type = %card_type, error = %err, "fallback failed, card skipped");
                        self.stats.failures += 1;
                        return None;
                    }
                }
            }
        };

        self.stats.rendered += 1;
        *self.stats.by_type.entry(card_type).or_default() += 1;
        tracing::debug!(card = index, card_type = %card_type, model = fields.model().name(), "card rendered");

        Some(RenderedNote {
            card_type,
            fields,
            tags,
            fallback,
        })
    }
}

/// Dispatch table. Several types share a handler.
fn handler_for<C: MarkupConverter>(card_type: CardType) -> Handler<C> {
    match card_type {
        CardType::Basic
        | CardType::Math
        | CardType::Spelling
        | CardType::Timeline
        | CardType::Matching
        | CardType::Ordering
        | CardType::ShortAnswer => render_basic::<C>,
        CardType::Reversed | CardType::BasicAndReversed => render_reversed::<C>,
        CardType::Cloze => render_cloze::<C>,
        CardType::FillInTheBlank => render_fill_in_blank::<C>,
        CardType::MultipleChoice => render_multiple_choice::<C>,
        CardType::TrueFalse => render_true_false::<C>,
        CardType::ImageOcclusion => render_image_occlusion::<C>,
        CardType::Audio => render_audio::<C>,
    }
}

/// SHA-256 over type, front, back, options and the rest of the card's
/// content (correct answer, blanks, masked areas, audio file). Exact content
/// only.
pub fn fingerprint(card: &Card) -> String {
    let mut hasher = Sha256::new();
    hasher.update(card.card_type.as_str().as_bytes());
    for part in [card.front(), card.back()] {
        hasher.update([0x1f]);
        hasher.update(part.as_bytes());
    }
    for option in card.options() {
        hasher.update([0x1e]);
        hasher.update(option.as_bytes());
    }

    let mut extra = |part: &str| {
        hasher.update([0x1d]);
        hasher.update(part.as_bytes());
    };
    match &card.content {
        CardContent::Basic { .. } | CardContent::Cloze { .. } => {}
        CardContent::MultipleChoice { correct_answer, .. } => extra(correct_answer.as_str()),
        CardContent::TrueFalse { answer, .. } => extra(bool_label(*answer)),
        CardContent::ImageOcclusion { masked_areas, .. } => {
            for area in masked_areas {
                extra(&format!("{},{},{},{}", area.left, area.top, area.width, area.height));
            }
        }
        CardContent::FillInTheBlank { answers, .. } => answers.iter().for_each(|a| extra(a.as_str())),
        CardContent::Audio { audio, .. } => extra(audio.as_deref().unwrap_or_default()),
    }

    format!("{:x}", hasher.finalize())
}

fn render_basic<C: MarkupConverter>(
    converter: &C,
    card: &Card,
    _tags: &[String],
) -> Result<NoteFields, RenderError> {
    let CardContent::Basic { front, back } = &card.content else {
        return Err(RenderError::ContentMismatch("basic"));
    };
    Ok(NoteFields::Basic {
        category: card.category.clone(),
        front: converter.convert(front)?,
        back: converter.convert(back)?,
        behavior: None,
    })
}

fn render_reversed<C: MarkupConverter>(
    converter: &C,
    card: &Card,
    _tags: &[String],
) -> Result<NoteFields, RenderError> {
    let CardContent::Basic { front, back } = &card.content else {
        return Err(RenderError::ContentMismatch("reversed"));
    };
    Ok(NoteFields::Basic {
        category: card.category.clone(),
        front: converter.convert(back)?,
        back: converter.convert(front)?,
        behavior: None,
    })
}

fn render_cloze<C: MarkupConverter>(
    converter: &C,
    card: &Card,
    tags: &[String],
) -> Result<NoteFields, RenderError> {
    let CardContent::Cloze { text, extra } = &card.content else {
        return Err(RenderError::ContentMismatch("cloze"));
    };
    cloze_fields(converter, card, tags, &number_cloze(text), extra)
}

fn render_fill_in_blank<C: MarkupConverter>(
    converter: &C,
    card: &Card,
    tags: &[String],
) -> Result<NoteFields, RenderError> {
    let CardContent::FillInTheBlank {
        front,
        back,
        answers,
    } = &card.content
    else {
        return Err(RenderError::ContentMismatch("fill-in-the-blank"));
    };
    cloze_fields(converter, card, tags, &blanks_to_cloze(front, back, answers), "")
}

fn cloze_fields<C: MarkupConverter>(
    converter: &C,
    card: &Card,
    tags: &[String],
    text: &str,
    extra: &str,
) -> Result<NoteFields, RenderError> {
    let tags: String = tags
        .iter()
        .map(|t| format!(r#"<span class="tag">{}</span>"#, escape_html(t)))
        .collect::<Vec<_>>()
        .join(" ");
    let text = format!(
        r#"<div class="cloze-section"><div class="question-content">{}</div><div class="tags-container">{tags}</div></div>"#,
        converter.convert(text)?
    );
    Ok(NoteFields::Cloze {
        text,
        extra: converter.convert(extra)?,
        category: card.category.clone(),
    })
}

/// Number bare `{{text}}` deletions as `{{c1::text}}`, `{{c2::text}}`, ...
///
/// Text that already carries numbered deletions is returned unchanged.
/// Deletions may span lines. Fence lines are copied verbatim, so a deletion
/// touching one is left bare; deletions inside fenced code are numbered in
/// sequence with the rest.
pub fn number_cloze(text: &str) -> String {
    if NUMBERED_CLOZE_RE.is_match(text) {
        return text.to_string();
    }

    let fences = fence_lines(text);
    let mut counter = 0;
    BARE_CLOZE_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let span = caps.get(0).map_or(0..0, |m| m.range());
            if fences.iter().any(|f| f.start < span.end && span.start < f.end) {
                return caps[0].to_string();
            }
            counter += 1;
            format!("{{{{c{counter}::{}}}}}", &caps[1])
        })
        .into_owned()
}

/// Byte ranges of lines opening or closing a code fence.
fn fence_lines(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut offset = 0;
    for line in text.split('\n') {
        if line.trim_start().starts_with("```") {
            ranges.push(offset..offset + line.len());
        }
        offset += line.len() + 1;
    }
    ranges
}

/// Turn `_____` blanks into cloze deletions.
///
/// With one answer per blank, blank *i* gets answer *i*; otherwise every
/// blank reveals the whole back.
pub fn blanks_to_cloze(front: &str, back: &str, answers: &[String]) -> String {
    let pieces: Vec<&str> = front.split(BLANK).collect();
    let blanks = pieces.len() - 1;
    let per_blank = answers.len() == blanks && answers.iter().all(|a| !a.is_empty());

    let mut out = String::with_capacity(front.len() + back.len() * blanks.max(1));
    for (idx, piece) in pieces.iter().enumerate() {
        out.push_str(piece);
        if idx == blanks {
            break;
        }
        if per_blank {
            let _ = write!(out, "{{{{c{}::{}}}}}", idx + 1, answers[idx].trim());
        } else {
            let _ = write!(out, "{{{{c1::{}}}}}", back.trim());
        }
    }
    out
}

fn render_multiple_choice<C: MarkupConverter>(
    converter: &C,
    card: &Card,
    _tags: &[String],
) -> Result<NoteFields, RenderError> {
    let CardContent::MultipleChoice {
        question,
        options,
        correct_answer,
        explanation,
    } = &card.content
    else {
        return Err(RenderError::ContentMismatch("multiple-choice"));
    };

    let question_html = converter.convert(question)?;
    let correct = correct_answer.trim().to_lowercase();

    let mut choices = format!(
        r#"<div class="mcq-section"><div class="mcq-question">{question_html}</div><div class="multiple-choice" id="mcq-options">"#
    );
    let mut reveal = format!(
        r#"<div class="mcq-section"><div class="mcq-question">{question_html}</div><div class="multiple-choice answer-reveal">"#
    );

    for option in options {
        let option_html = converter.convert(option)?;
        let is_correct = option.trim().to_lowercase() == correct;

        let _ = write!(
            choices,
            r#"<div class="mcq-option" data-revealed="false" data-correct="{is_correct}" onclick="checkMCQAnswer(this, {is_correct})"><div class="mcq-option-content"><span class="mcq-option-text">{option_html}</span><span class="mcq-result-icon"></span></div></div>"#
        );

        let (class, icon) = if is_correct {
            ("opt-correct", "✓")
        } else {
            ("opt-incorrect", "✗")
        };
        let _ = write!(
            reveal,
            r#"<div class="mcq-option {class}"><div class="mcq-option-content"><span class="mcq-option-text">{option_html}</span><span class="mcq-result-icon">{icon}</span></div></div>"#
        );
    }

    choices.push_str("</div></div>");
    reveal.push_str("</div>");
    if !explanation.is_empty() {
        let _ = write!(
            reveal,
            r#"<div class="mcq-explanation">{}</div>"#,
            converter.convert(explanation)?
        );
    }
    reveal.push_str("</div>");

    Ok(NoteFields::MultipleChoice {
        category: card.category.clone(),
        question: question_html,
        options: choices,
        answer: reveal,
        behavior: Behavior::MultipleChoiceSelection,
    })
}

fn render_true_false<C: MarkupConverter>(
    converter: &C,
    card: &Card,
    _tags: &[String],
) -> Result<NoteFields, RenderError> {
    let CardContent::TrueFalse {
        statement,
        answer,
        explanation,
    } = &card.content
    else {
        return Err(RenderError::ContentMismatch("true-false"));
    };

    let mut front = converter.convert(statement)?;
    let _ = write!(
        front,
        r#"<div class="true-false-container"><div class="tf-button" id="true-btn" data-correct="{}">True</div><div class="tf-button" id="false-btn" data-correct="{}">False</div></div>"#,
        *answer,
        !*answer
    );

    let mut back = converter.convert(explanation)?;
    let _ = write!(
        back,
        "<p><strong>Correct answer:</strong> {}</p>",
        bool_label(*answer)
    );

    Ok(NoteFields::Basic {
        category: card.category.clone(),
        front,
        back,
        behavior: Some(Behavior::TrueFalseSelection),
    })
}

fn render_image_occlusion<C: MarkupConverter>(
    converter: &C,
    card: &Card,
    _tags: &[String],
) -> Result<NoteFields, RenderError> {
    let CardContent::ImageOcclusion {
        front,
        masked_areas,
        back,
    } = &card.content
    else {
        return Err(RenderError::ContentMismatch("image-occlusion"));
    };

    let mut front_html = converter.convert(front)?;
    front_html.push_str(r#"<div class="image-occlusion-container" style="position: relative;">"#);
    for area in masked_areas {
        front_html.push_str(&occlusion_rect(area));
    }
    front_html.push_str("</div>");

    Ok(NoteFields::Basic {
        category: card.category.clone(),
        front: front_html,
        back: converter.convert(back)?,
        behavior: None,
    })
}

fn occlusion_rect(area: &MaskedArea) -> String {
    format!(
        r#"<div class="occlusion-rect" style="position: absolute; left: {}px; top: {}px; width: {}px; height: {}px; background-color: black;"></div>"#,
        area.left, area.top, area.width, area.height
    )
}

fn render_audio<C: MarkupConverter>(
    converter: &C,
    card: &Card,
    _tags: &[String],
) -> Result<NoteFields, RenderError> {
    let CardContent::Audio { front, back, audio } = &card.content else {
        return Err(RenderError::ContentMismatch("audio"));
    };

    let mut front_html = canonical_sound_refs(&converter.convert(front)?);
    if let Some(file) = audio {
        if !front_html.contains("[sound:") {
            let _ = write!(front_html, "[sound:{}]", file.trim());
        }
    }

    Ok(NoteFields::Basic {
        category: card.category.clone(),
        front: front_html,
        back: converter.convert(back)?,
        behavior: None,
    })
}

/// Rewrite `[audio:x]` and `[sound:x]` into the canonical `[sound:x]`.
pub fn canonical_sound_refs(html: &str) -> String {
    AUDIO_REF_RE
        .replace_all(html, |caps: &Captures<'_>| format!("[sound:{}]", caps[1].trim()))
        .into_owned()
}

/// Minimal note built from escaped text, without markup conversion.
fn plain_fallback(card: &Card) -> Result<NoteFields, RenderError> {
    let front = card.front().trim();
    if front.is_empty() {
        return Err(RenderError::Empty);
    }
    let paragraphs = |text: &str| escape_html(text).replace('\n', "<br>");
    Ok(NoteFields::Basic {
        category: card.category.clone(),
        front: paragraphs(front),
        back: paragraphs(card.back().trim()),
        behavior: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::MarkdownConverter;
    use pretty_assertions::assert_eq;

    fn card(card_type: CardType, content: CardContent) -> Card {
        Card {
            card_type,
            category: "geo".to_string(),
            tags: vec!["geo".to_string()],
            content,
            line_number: 1,
        }
    }

    fn basic(front: &str, back: &str) -> Card {
        card(
            CardType::Basic,
            CardContent::Basic {
                front: front.to_string(),
                back: back.to_string(),
            },
        )
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    struct FailingConverter;

    impl MarkupConverter for FailingConverter {
        fn convert(&self, _text: &str) -> Result<String, RenderError> {
            Err(RenderError::Conversion("boom".to_string()))
        }
    }

    #[test]
    fn number_cloze_assigns_sequential_indices() {
        assert_eq!(
            number_cloze("The capital of France is {{Paris}}."),
            "The capital of France is {{c1::Paris}}."
        );
        assert_eq!(number_cloze("{{a}} then {{b}}\n{{c}}"), "{{c1::a}} then {{c2::b}}\n{{c3::c}}");
    }

    #[test]
    fn number_cloze_is_idempotent() {
        let numbered = "Already {{c1::x}} and {{y}}";
        assert_eq!(number_cloze(numbered), numbered);
        let once = number_cloze("{{a}} {{b}}");
        assert_eq!(number_cloze(&once), once);
    }

    #[test]
    fn number_cloze_keeps_fences_and_numbers_inside() {
        let text = "Intro {{one}}\n```rust\nlet x = {{two}};\n```";
        assert_eq!(
            number_cloze(text),
            "Intro {{c1::one}}\n```rust\nlet x = {{c2::two}};\n```"
        );
    }

    #[test]
    fn number_cloze_handles_deletions_across_lines() {
        assert_eq!(
            number_cloze("Start {{first\nsecond}} end {{third}}"),
            "Start {{c1::first\nsecond}} end {{c2::third}}"
        );
    }

    #[test]
    fn number_cloze_leaves_deletions_touching_fence_lines() {
        let text = "{{open\n```\nclose}} and {{kept}}";
        assert_eq!(number_cloze(text), "{{open\n```\nclose}} and {{c1::kept}}");
    }

    #[test]
    fn blanks_map_to_answers_or_whole_back() {
        assert_eq!(
            blanks_to_cloze("Capital is _____.", "Paris", &strings(&["Paris"])),
            "Capital is {{c1::Paris}}."
        );
        assert_eq!(
            blanks_to_cloze("_____ and _____", "salt, pepper", &strings(&["salt", "pepper"])),
            "{{c1::salt}} and {{c2::pepper}}"
        );
        assert_eq!(
            blanks_to_cloze("_____ and _____", "salt", &strings(&["salt"])),
            "{{c1::salt}} and {{c1::salt}}"
        );
    }

    #[test]
    fn basic_card_renders_markdown() {
        let mut renderer = Renderer::new(MarkdownConverter);
        let note = renderer
            .render(1, &basic("What is **2+2**?", "4"), &strings(&["deck"]))
            .unwrap();
        assert_eq!(
            note.fields,
            NoteFields::Basic {
                category: "geo".into(),
                front: "<p>What is <strong>2+2</strong>?</p>".into(),
                back: "<p>4</p>".into(),
                behavior: None,
            }
        );
        assert_eq!(note.tags, vec!["deck", "geo"]);
        assert!(!note.fallback);
    }

    #[test]
    fn reversed_card_swaps_sides() {
        let reversed = card(
            CardType::Reversed,
            CardContent::Basic {
                front: "Hund".into(),
                back: "Dog".into(),
            },
        );
        let note = Renderer::new(MarkdownConverter).render(1, &reversed, &[]).unwrap();
        let NoteFields::Basic { front, back, .. } = note.fields else {
            panic!("expected basic fields");
        };
        assert_eq!(front, "<p>Dog</p>");
        assert_eq!(back, "<p>Hund</p>");
    }

    #[test]
    fn cloze_card_uses_cloze_model() {
        let cloze = card(
            CardType::Cloze,
            CardContent::Cloze {
                text: "The capital of France is {{Paris}}.".into(),
                extra: String::new(),
            },
        );
        let note = Renderer::new(MarkdownConverter)
            .render(1, &cloze, &strings(&["deck"]))
            .unwrap();
        assert_eq!(note.fields.model(), NoteModel::Cloze);
        let NoteFields::Cloze { text, .. } = note.fields else {
            panic!("expected cloze fields");
        };
        assert!(text.contains("The capital of France is {{c1::Paris}}."), "{text}");
        assert!(
            text.contains(r#"<div class="tags-container"><span class="tag">deck</span> <span class="tag">geo</span></div>"#),
            "{text}"
        );
    }

    #[test]
    fn multiple_choice_flags_correct_option() {
        let mcq = card(
            CardType::MultipleChoice,
            CardContent::MultipleChoice {
                question: "Capital?".into(),
                options: strings(&["Paris", "London"]),
                correct_answer: "paris".into(),
                explanation: "Since 987.".into(),
            },
        );
        let note = Renderer::new(MarkdownConverter).render(1, &mcq, &[]).unwrap();
        let NoteFields::MultipleChoice {
            options,
            answer,
            behavior,
            ..
        } = note.fields
        else {
            panic!("expected multiple choice fields");
        };
        assert_eq!(behavior, Behavior::MultipleChoiceSelection);
        assert_eq!(options.matches(r#"data-revealed="false""#).count(), 2);
        assert_eq!(options.matches(r#"data-correct="true""#).count(), 1);
        assert!(options.contains(r#"data-correct="true" onclick="checkMCQAnswer(this, true)"><div class="mcq-option-content"><span class="mcq-option-text"><p>Paris</p>"#));
        assert_eq!(answer.matches("opt-correct").count(), 1);
        assert_eq!(answer.matches("opt-incorrect").count(), 1);
        assert!(answer.contains("Since 987."));
    }

    #[test]
    fn true_false_flags_exactly_one_button() {
        let tf = card(
            CardType::TrueFalse,
            CardContent::TrueFalse {
                statement: "Fish can fly".into(),
                answer: false,
                explanation: String::new(),
            },
        );
        let note = Renderer::new(MarkdownConverter).render(1, &tf, &[]).unwrap();
        let NoteFields::Basic {
            front,
            back,
            behavior,
            ..
        } = note.fields
        else {
            panic!("expected basic fields");
        };
        assert_eq!(behavior, Some(Behavior::TrueFalseSelection));
        assert_eq!(front.matches(r#"data-correct="true""#).count(), 1);
        assert!(front.contains(r#"id="false-btn" data-correct="true""#));
        assert!(back.ends_with("<p><strong>Correct answer:</strong> False</p>"));
    }

    #[test]
    fn image_occlusion_overlays_rectangles() {
        let io = card(
            CardType::ImageOcclusion,
            CardContent::ImageOcclusion {
                front: "![Heart](heart.png)".into(),
                masked_areas: vec![MaskedArea {
                    left: 10.0,
                    top: 20.0,
                    width: 100.0,
                    height: 50.5,
                }],
                back: "Aorta".into(),
            },
        );
        let note = Renderer::new(MarkdownConverter).render(1, &io, &[]).unwrap();
        let NoteFields::Basic { front, .. } = note.fields else {
            panic!("expected basic fields");
        };
        assert!(front.contains("left: 10px; top: 20px; width: 100px; height: 50.5px;"), "{front}");
        assert_eq!(front.matches("occlusion-rect").count(), 1);
    }

    #[test]
    fn audio_references_are_canonical() {
        let inline = card(
            CardType::Audio,
            CardContent::Audio {
                front: "Listen [audio:hello.mp3]".into(),
                back: String::new(),
                audio: Some("other.mp3".into()),
            },
        );
        let note = Renderer::new(MarkdownConverter).render(1, &inline, &[]).unwrap();
        let NoteFields::Basic { front, .. } = note.fields else {
            panic!("expected basic fields");
        };
        assert!(front.contains("[sound:hello.mp3]"), "{front}");
        assert!(!front.contains("other.mp3"));

        let field_only = card(
            CardType::Audio,
            CardContent::Audio {
                front: "Listen".into(),
                back: String::new(),
                audio: Some("bell.mp3".into()),
            },
        );
        let note = Renderer::new(MarkdownConverter).render(1, &field_only, &[]).unwrap();
        let NoteFields::Basic { front, .. } = note.fields else {
            panic!("expected basic fields");
        };
        assert!(front.ends_with("[sound:bell.mp3]"), "{front}");
    }

    #[test]
    fn exact_duplicates_are_skipped_once_seen() {
        let mut renderer = Renderer::new(MarkdownConverter);
        assert!(renderer.render(1, &basic("Q", "A"), &[]).is_some());
        assert!(renderer.render(2, &basic("Q", "A"), &[]).is_none());
        assert!(renderer.render(3, &basic("Q", "A2"), &[]).is_some());
        assert!(renderer.render(4, &basic("Q longer", "A"), &[]).is_some());
        assert_eq!(renderer.stats().duplicates, 1);
        assert_eq!(renderer.stats().rendered, 3);
    }

    #[test]
    fn handlers_emit_the_model_for_their_type() {
        let cards = [
            basic("Q", "A"),
            card(
                CardType::Timeline,
                CardContent::Basic {
                    front: "1789".into(),
                    back: "Revolution".into(),
                },
            ),
            card(
                CardType::FillInTheBlank,
                CardContent::FillInTheBlank {
                    front: "_____ is red".into(),
                    back: "Mars".into(),
                    answers: strings(&["Mars"]),
                },
            ),
            card(
                CardType::MultipleChoice,
                CardContent::MultipleChoice {
                    question: "Q".into(),
                    options: strings(&["A", "B"]),
                    correct_answer: "A".into(),
                    explanation: String::new(),
                },
            ),
            card(
                CardType::TrueFalse,
                CardContent::TrueFalse {
                    statement: "S".into(),
                    answer: true,
                    explanation: String::new(),
                },
            ),
        ];
        let mut renderer = Renderer::new(MarkdownConverter);
        for (idx, card) in cards.iter().enumerate() {
            let note = renderer.render(idx + 1, card, &[]).unwrap();
            assert_eq!(note.fields.model(), NoteModel::for_type(card.card_type));
        }
    }

    #[test]
    fn mismatched_content_uses_fallback() {
        let odd = card(
            CardType::Cloze,
            CardContent::Basic {
                front: "Q".into(),
                back: "A".into(),
            },
        );
        let note = Renderer::new(MarkdownConverter).render(1, &odd, &[]).unwrap();
        assert!(note.fallback);
        assert_eq!(note.fields.model(), NoteModel::Basic);
    }

    #[test]
    fn dedupe_can_be_disabled() {
        let mut renderer = Renderer::new(MarkdownConverter).with_dedupe(false);
        assert!(renderer.render(1, &basic("Q", "A"), &[]).is_some());
        assert!(renderer.render(2, &basic("Q", "A"), &[]).is_some());
    }

    #[test]
    fn converter_failure_falls_back_to_plain_text() {
        let mut renderer = Renderer::new(FailingConverter);
        let note = renderer.render(1, &basic("a < b\nline", "yes"), &[]).unwrap();
        assert!(note.fallback);
        let NoteFields::Basic { front, .. } = note.fields else {
            panic!("expected basic fields");
        };
        assert_eq!(front, "a &lt; b<br>line");
        assert_eq!(renderer.stats().fallbacks, 1);
    }

    #[test]
    fn field_values_follow_model_order() {
        let fields = NoteFields::Cloze {
            text: "t".into(),
            extra: "e".into(),
            category: "c".into(),
        };
        assert_eq!(fields.model().field_names(), &["Text", "Back", "Category"]);
        assert_eq!(fields.values(), strings(&["t", "e", "c"]));
    }

    #[test]
    fn occlusion_cards_with_different_areas_are_not_duplicates() {
        let area = |left: f64| MaskedArea {
            left,
            top: 20.0,
            width: 30.0,
            height: 40.0,
        };
        let occlusion = |left: f64| {
            card(
                CardType::ImageOcclusion,
                CardContent::ImageOcclusion {
                    front: "![Heart](heart.png)".into(),
                    masked_areas: vec![area(left)],
                    back: "Aorta".into(),
                },
            )
        };
        let (a, b) = (occlusion(10.0), occlusion(200.0));
        assert_ne!(fingerprint(&a), fingerprint(&b));

        let mut renderer = Renderer::new(MarkdownConverter);
        assert!(renderer.render(1, &a, &[]).is_some());
        assert!(renderer.render(2, &b, &[]).is_some());
        assert!(renderer.render(3, &occlusion(10.0), &[]).is_none());
    }

    #[test]
    fn fingerprint_covers_answer_and_audio() {
        let statement = |answer: bool| {
            card(
                CardType::TrueFalse,
                CardContent::TrueFalse {
                    statement: "S".into(),
                    answer,
                    explanation: String::new(),
                },
            )
        };
        assert_ne!(fingerprint(&statement(true)), fingerprint(&statement(false)));

        let clip = |file: &str| {
            card(
                CardType::Audio,
                CardContent::Audio {
                    front: "Listen".into(),
                    back: String::new(),
                    audio: Some(file.into()),
                },
            )
        };
        assert_ne!(fingerprint(&clip("a.mp3")), fingerprint(&clip("b.mp3")));
    }

    #[test]
    fn fingerprint_distinguishes_options() {
        let a = card(
            CardType::MultipleChoice,
            CardContent::MultipleChoice {
                question: "Q".into(),
                options: strings(&["A", "B"]),
                correct_answer: "A".into(),
                explanation: String::new(),
            },
        );
        let mut b = a.clone();
        if let CardContent::MultipleChoice { options, .. } = &mut b.content {
            options.push("C".into());
        }
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    }
}
