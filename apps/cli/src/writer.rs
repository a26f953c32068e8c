//! JSON deck package.

use chrono::{DateTime, Utc};
use flashcard_core::{CardType, Deck, DeckStyle, DeckWriter, NoteModel, Result, RunError};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Writes `<folder>/<file_stem>.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDeckWriter;

#[derive(Debug, Serialize)]
struct DeckPackage<'a> {
    id: Uuid,
    name: &'a str,
    description: &'a str,
    created_at: DateTime<Utc>,
    diagnostic: bool,
    style: &'a DeckStyle,
    models: Vec<ModelEntry>,
    notes: Vec<NoteEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    name: &'static str,
    fields: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct NoteEntry<'a> {
    model: &'static str,
    card_type: CardType,
    fields: Vec<FieldEntry>,
    tags: &'a [String],
    fallback: bool,
}

#[derive(Debug, Serialize)]
struct FieldEntry {
    name: &'static str,
    value: String,
}

impl<'a> DeckPackage<'a> {
    fn from_deck(deck: &'a Deck) -> Self {
        let models = NoteModel::ALL
            .into_iter()
            .filter(|model| deck.notes.iter().any(|n| n.fields.model() == *model))
            .map(|model| ModelEntry {
                name: model.name(),
                fields: model.field_names(),
            })
            .collect();

        let notes = deck
            .notes
            .iter()
            .map(|note| {
                let model = note.fields.model();
                NoteEntry {
                    model: model.name(),
                    card_type: note.card_type,
                    fields: model
                        .field_names()
                        .iter()
                        .zip(note.fields.values())
                        .map(|(&name, value)| FieldEntry { name, value })
                        .collect(),
                    tags: &note.tags,
                    fallback: note.fallback,
                }
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            name: &deck.name,
            description: &deck.description,
            created_at: Utc::now(),
            diagnostic: deck.diagnostic,
            style: &deck.style,
            models,
            notes,
        }
    }
}

/// Path separators in a deck name would escape the output folder.
fn file_name(stem: &str) -> String {
    let safe: String = stem
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{safe}.json")
}

impl DeckWriter for JsonDeckWriter {
    fn write(&self, deck: &Deck, folder: &Path) -> Result<PathBuf> {
        fs::create_dir_all(folder)
            .map_err(|e| RunError::Package(format!("creating {}: {e}", folder.display())))?;

        let package = DeckPackage::from_deck(deck);
        let json = serde_json::to_string_pretty(&package)
            .map_err(|e| RunError::Package(format!("serializing deck: {e}")))?;

        let path = folder.join(file_name(&deck.file_stem));
        fs::write(&path, json)
            .map_err(|e| RunError::Package(format!("writing {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), notes = deck.notes.len(), "deck package written");
        Ok(path)
    }
}
