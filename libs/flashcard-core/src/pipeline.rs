//! End-to-end deck build: extract, validate, render.
//!
//! Per-card problems are contained here. Only run-level conditions surface as
//! [`RunError`], and [`diagnostic_deck`] turns those into a one-card deck so the
//! caller always has something to write.

use crate::error::{RejectionReason, Result, RunError};
use crate::markdown::MarkupConverter;
use crate::parser;
use crate::render::{NoteFields, RenderStats, RenderedNote, Renderer};
use crate::style::DeckStyle;
use crate::types::CardType;
use crate::validator::validate;
use serde::Serialize;

/// Minimum share of accepted cards that should render cleanly.
const RENDER_RATIO_WARNING: f64 = 0.7;

/// Per-run settings, resolved once by the caller.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub deck_name: String,
    pub global_tags: Vec<String>,
    pub style: DeckStyle,
    pub dedupe: bool,
}

/// Render-ready deck handed to a [`crate::package::DeckWriter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deck {
    pub name: String,
    /// File name without extension.
    pub file_stem: String,
    pub description: String,
    pub style: DeckStyle,
    pub notes: Vec<RenderedNote>,
    /// Built by [`diagnostic_deck`] after a run failure.
    pub diagnostic: bool,
}

/// A block the validator refused.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCard {
    /// 1-based position among extracted blocks.
    pub index: usize,
    pub line_number: usize,
    pub card_type: CardType,
    pub reason: RejectionReason,
}

/// Counts for one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub found: usize,
    pub accepted: usize,
    pub auto_corrected: usize,
    pub rejected: Vec<RejectedCard>,
    pub render: RenderStats,
}

impl BuildReport {
    /// Line printed for every run, successful or not.
    pub fn summary_line(&self) -> String {
        format!(
            "{} cards passed validation, {} cards rejected, {} cards auto-corrected",
            self.accepted,
            self.rejected.len(),
            self.auto_corrected
        )
    }
}

#[derive(Debug)]
pub struct BuildOutcome {
    pub report: BuildReport,
    pub deck: Result<Deck>,
}

/// Run the whole pipeline over one note.
pub fn build_deck<C: MarkupConverter>(
    content: &str,
    options: &BuildOptions,
    converter: C,
) -> BuildOutcome {
    let mut report = BuildReport::default();

    let raw_cards = parser::parse(content);
    report.found = raw_cards.len();
    tracing::info!(found = report.found, "extracted card blocks");

    if raw_cards.is_empty() {
        tracing::error!("no cards found in note");
        return BuildOutcome {
            report,
            deck: Err(RunError::NoCardsFound),
        };
    }

    let mut accepted = Vec::with_capacity(raw_cards.len());
    for (idx, raw) in raw_cards.iter().enumerate() {
        let index = idx + 1;
        match validate(raw) {
            Ok(validated) => {
                let card_type = validated.card.card_type;
                for correction in &validated.corrections {
                    tracing::info!(card = index, card_type = %card_type, line = raw.line_number, "auto-corrected: {correction}");
                }
                if validated.was_corrected() {
                    report.auto_corrected += 1;
                }
                tracing::debug!(card = index, card_type = %card_type, "card accepted");
                accepted.push((index, validated.card));
            }
            Err(reason) => {
                let card_type = CardType::normalize(raw.card_type.as_deref()).card_type;
                tracing::warn!(card = index, card_type = %card_type, line = raw.line_number, "card rejected: {reason}");
                report.rejected.push(RejectedCard {
                    index,
                    line_number: raw.line_number,
                    card_type,
                    reason,
                });
            }
        }
    }
    report.accepted = accepted.len();

    if accepted.is_empty() {
        let err = RunError::NoValidCards {
            rejected: report.rejected.len(),
        };
        tracing::error!(error = %err, "nothing left to render");
        return BuildOutcome {
            report,
            deck: Err(err),
        };
    }

    let mut renderer = Renderer::new(converter).with_dedupe(options.dedupe);
    let notes: Vec<RenderedNote> = accepted
        .iter()
        .filter_map(|(index, card)| renderer.render(*index, card, &options.global_tags))
        .collect();
    report.render = renderer.into_stats();

    log_summary(&report);

    if notes.is_empty() {
        return BuildOutcome {
            deck: Err(RunError::NothingRendered {
                accepted: report.accepted,
            }),
            report,
        };
    }

    let deck = Deck {
        name: options.deck_name.clone(),
        file_stem: options.deck_name.clone(),
        description: format!("Generated from notes: {}", options.deck_name),
        style: options.style.clone(),
        notes,
        diagnostic: false,
    };
    BuildOutcome {
        report,
        deck: Ok(deck),
    }
}

fn log_summary(report: &BuildReport) {
    let stats = &report.render;
    for (card_type, count) in &stats.by_type {
        tracing::info!(card_type = %card_type, count, "rendered by type");
    }
    tracing::info!(
        rendered = stats.rendered,
        duplicates = stats.duplicates,
        fallbacks = stats.fallbacks,
        failures = stats.failures,
        "render summary"
    );

    if report.accepted > 0 {
        let ratio = stats.rendered as f64 / report.accepted as f64;
        if ratio < RENDER_RATIO_WARNING {
            tracing::warn!(
                rendered = stats.rendered,
                accepted = report.accepted,
                "only {:.0}% of valid cards were rendered",
                ratio * 100.0
            );
        }
    }
}

/// One-card deck describing a run failure.
pub fn diagnostic_deck(deck_name: &str, style: DeckStyle, error: &RunError) -> Deck {
    let back = format!(
        r#"<div class="error">The following error occurred while creating your flashcards:</div><br><pre>{}</pre><br>Please check the log for more details."#,
        crate::markdown::escape_html(&error.to_string())
    );
    let note = RenderedNote {
        card_type: CardType::Basic,
        fields: NoteFields::Basic {
            category: "Error".to_string(),
            front: "Error during flashcard creation".to_string(),
            back,
            behavior: None,
        },
        tags: vec!["error".to_string()],
        fallback: false,
    };

    Deck {
        name: format!("{deck_name} (Error Recovery)"),
        file_stem: format!("{deck_name}_ERROR"),
        description: format!("Error recovery deck: {error}"),
        style,
        notes: vec![note],
        diagnostic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::MarkdownConverter;
    use crate::render::NoteModel;
    use crate::style::BuiltinStyles;
    use pretty_assertions::assert_eq;

    fn options() -> BuildOptions {
        BuildOptions {
            deck_name: "Geo".to_string(),
            global_tags: vec!["deck".to_string()],
            style: DeckStyle::resolve(&BuiltinStyles, "default", None),
            dedupe: true,
        }
    }

    const NOTE: &str = "# Geography\n\n<!-- Anki Card -->\n<!-- type: basic -->\n<!-- front -->\nWhat is 2+2?\n<!-- back -->\n4\n<!-- tags: math -->\n\n<!-- Anki Card -->\n<!-- type: multiplechoice -->\n<!-- front -->\nCapital of France?\n<!-- options -->\nParis\nLondon\nBerlin\n\n<!-- Anki Card -->\n<!-- type: cloze -->\n<!-- front -->\nNo markers here\n\n<!-- Anki Card -->\n<!-- type: cloze -->\n<!-- front -->\nThe capital of France is {{Paris}}.\n";

    #[test]
    fn builds_deck_and_counts() {
        let outcome = build_deck(NOTE, &options(), MarkdownConverter);
        let report = &outcome.report;
        assert_eq!(report.found, 4);
        assert_eq!(report.accepted, 3);
        assert_eq!(report.auto_corrected, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 3);
        assert_eq!(report.rejected[0].line_number, 21);
        assert_eq!(report.rejected[0].reason, RejectionReason::NoClozeMarkers);
        assert_eq!(
            report.summary_line(),
            "3 cards passed validation, 1 cards rejected, 1 cards auto-corrected"
        );

        let deck = outcome.deck.unwrap();
        assert_eq!(deck.name, "Geo");
        assert!(!deck.diagnostic);
        let models: Vec<NoteModel> = deck.notes.iter().map(|n| n.fields.model()).collect();
        assert_eq!(
            models,
            vec![NoteModel::Basic, NoteModel::MultipleChoice, NoteModel::Cloze]
        );
        assert_eq!(deck.notes[0].tags, vec!["deck", "math"]);
    }

    #[test]
    fn empty_note_reports_no_cards_found() {
        let outcome = build_deck("Just some prose, no cards.", &options(), MarkdownConverter);
        assert_eq!(outcome.deck.unwrap_err(), RunError::NoCardsFound);
        assert_eq!(outcome.report.found, 0);
    }

    #[test]
    fn all_rejected_reports_no_valid_cards() {
        let note = "<!-- Anki Card --><!-- type: multiple-choice --><!-- front -->Q<!-- options -->Only";
        let outcome = build_deck(note, &options(), MarkdownConverter);
        assert_eq!(
            outcome.deck.unwrap_err(),
            RunError::NoValidCards { rejected: 1 }
        );
        assert_eq!(
            outcome.report.rejected[0].reason,
            RejectionReason::TooFewOptions { found: 1 }
        );
    }

    #[test]
    fn duplicates_follow_dedupe_setting() {
        let note = "<!-- Anki Card --><!-- front -->Q<!-- back -->A\n<!-- Anki Card --><!-- front -->Q<!-- back -->A";
        let outcome = build_deck(note, &options(), MarkdownConverter);
        assert_eq!(outcome.report.render.duplicates, 1);
        assert_eq!(outcome.deck.unwrap().notes.len(), 1);

        let keep = BuildOptions {
            dedupe: false,
            ..options()
        };
        let outcome = build_deck(note, &keep, MarkdownConverter);
        assert_eq!(outcome.deck.unwrap().notes.len(), 2);
    }

    #[test]
    fn diagnostic_deck_names_the_failure() {
        let style = DeckStyle::resolve(&BuiltinStyles, "default", None);
        let deck = diagnostic_deck("Geo", style, &RunError::NoCardsFound);
        assert_eq!(deck.name, "Geo (Error Recovery)");
        assert_eq!(deck.file_stem, "Geo_ERROR");
        assert!(deck.diagnostic);
        assert_eq!(deck.notes.len(), 1);
        let NoteFields::Basic { front, back, .. } = &deck.notes[0].fields else {
            panic!("expected basic fields");
        };
        assert_eq!(front, "Error during flashcard creation");
        assert!(back.contains("<pre>no cards found in the note"), "{back}");
    }
}
