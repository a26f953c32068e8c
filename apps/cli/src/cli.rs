use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Convert an annotated Markdown note into a styled flashcard deck.
#[derive(Parser, Debug, Clone)]
#[command(name = "flashcard-maker", version, about, long_about = None)]
pub struct Cli {
    /// Markdown note containing `<!-- Anki Card -->` blocks.
    pub note_path: PathBuf,

    /// Folder the deck file is written to (created if missing).
    pub deck_folder: PathBuf,

    /// Deck name, also used as the output file name.
    pub deck_name: String,

    /// Comma-separated tags added to every card.
    pub tags: Option<String>,

    /// Built-in card style: default, retro or minimal.
    #[arg(long, default_value = flashcard_core::style::DEFAULT_STYLE)]
    pub card_style: String,

    /// Extra CSS appended to the style's stylesheet.
    #[arg(long, value_name = "FILE")]
    pub custom_css: Option<PathBuf>,

    /// Verbose logging.
    #[arg(long, env = "DEBUG_MODE", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub debug: bool,

    /// Keep cards whose content exactly repeats an earlier card.
    #[arg(long)]
    pub keep_duplicates: bool,
}
