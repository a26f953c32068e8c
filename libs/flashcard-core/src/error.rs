//! Error types for flashcard-core.

use thiserror::Error;

/// Result type alias using RunError.
pub type Result<T> = std::result::Result<T, RunError>;

/// Why the validator refused a card block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectionReason {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("no cloze markers found")]
    NoClozeMarkers,

    #[error("at least 2 options required, found {found}")]
    TooFewOptions { found: usize },

    #[error("correct answer {given:?} does not match any option")]
    UnmatchedCorrectAnswer { given: String },

    #[error("front has no markdown image")]
    MissingImage,

    #[error("no masked areas")]
    MissingMaskedAreas,

    #[error("invalid masked area {entry:?}")]
    InvalidMaskedArea { entry: String },

    #[error("front has no _____ blank")]
    MissingBlank,

    #[error("answer {given:?} is not true or false")]
    NotBoolean { given: String },
}

/// Errors raised while turning a validated card into note fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("markup conversion failed: {0}")]
    Conversion(String),

    #[error("card content does not match type {0}")]
    ContentMismatch(&'static str),

    #[error("nothing to render")]
    Empty,
}

/// Run-level failures. Per-card problems never surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("no cards found in the note, check that it contains properly formatted cards")]
    NoCardsFound,

    #[error("no valid cards found after validation ({rejected} rejected), check card formatting")]
    NoValidCards { rejected: usize },

    #[error("none of the {accepted} valid cards could be rendered")]
    NothingRendered { accepted: usize },

    #[error("packaging failed: {0}")]
    Package(String),
}
