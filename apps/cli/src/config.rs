//! Validated run configuration.

use crate::cli::Cli;
use crate::error::ConfigError;
use flashcard_core::tags::parse_tags;
use std::fs;
use std::path::PathBuf;

/// Everything a run needs, checked once up front.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub note_path: PathBuf,
    pub deck_folder: PathBuf,
    pub deck_name: String,
    /// Sanitized deck-wide tags.
    pub global_tags: Vec<String>,
    pub card_style: String,
    /// Contents of `--custom-css`, if given.
    pub custom_css: Option<String>,
    pub dedupe: bool,
    pub debug: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if !cli.note_path.is_file() {
            return Err(ConfigError::NoteNotFound(cli.note_path));
        }

        let deck_name = cli.deck_name.trim().to_string();
        if deck_name.is_empty() {
            return Err(ConfigError::EmptyDeckName);
        }

        let custom_css = match cli.custom_css {
            Some(path) => match fs::read_to_string(&path) {
                Ok(css) => Some(css),
                Err(source) => return Err(ConfigError::CustomCss { path, source }),
            },
            None => None,
        };

        Ok(Self {
            note_path: cli.note_path,
            deck_folder: cli.deck_folder,
            deck_name,
            global_tags: cli.tags.as_deref().map(parse_tags).unwrap_or_default(),
            card_style: cli.card_style.trim().to_lowercase(),
            custom_css,
            dedupe: !cli.keep_duplicates,
            debug: cli.debug,
        })
    }
}
