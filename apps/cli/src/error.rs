//! Argument validation errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Note not found: {}", .0.display())]
    NoteNotFound(PathBuf),

    #[error("Deck name must not be empty")]
    EmptyDeckName,

    #[error("Cannot read custom CSS {}: {source}", .path.display())]
    CustomCss {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
