//! Packaging seam.
//!
//! The core stops at a render-ready [`Deck`]; turning it into a file is up to
//! a [`DeckWriter`] supplied by the caller.

use crate::error::{Result, RunError};
use crate::pipeline::{diagnostic_deck, BuildOutcome, Deck};
use crate::style::DeckStyle;
use std::path::{Path, PathBuf};

/// Persists a deck and reports where it went.
pub trait DeckWriter {
    fn write(&self, deck: &Deck, folder: &Path) -> Result<PathBuf>;
}

/// What a run finally produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered {
    pub path: PathBuf,
    /// Set when the run failed and a diagnostic deck was written instead.
    pub failure: Option<RunError>,
}

/// Write the built deck, or a diagnostic deck if the build or the write failed.
///
/// Errors only when the diagnostic deck itself cannot be written.
pub fn deliver<W: DeckWriter + ?Sized>(
    writer: &W,
    outcome: BuildOutcome,
    folder: &Path,
    deck_name: &str,
    style: &DeckStyle,
) -> Result<Delivered> {
    let failure = match outcome.deck {
        Ok(deck) => match writer.write(&deck, folder) {
            Ok(path) => {
                tracing::info!(path = %path.display(), notes = deck.notes.len(), "deck written");
                return Ok(Delivered {
                    path,
                    failure: None,
                });
            }
            Err(err) => {
                tracing::error!(error = %err, "writing deck failed");
                err
            }
        },
        Err(err) => err,
    };

    let recovery = diagnostic_deck(deck_name, style.clone(), &failure);
    let path = writer.write(&recovery, folder)?;
    tracing::warn!(path = %path.display(), "wrote error recovery deck");
    Ok(Delivered {
        path,
        failure: Some(failure),
    })
}
