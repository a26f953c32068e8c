//! Core note-to-deck pipeline.
//!
//! Provides:
//! - Card block extractor for annotated Markdown notes
//! - Validation with auto-correction of common authoring slips
//! - Render dispatch from card type to note fields
//! - Markdown/LaTeX conversion and deck styles
//! - Deck build orchestration and the packaging seam

pub mod error;
pub mod markdown;
pub mod package;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod style;
pub mod tags;
pub mod types;
pub mod validator;

pub use error::{RejectionReason, RenderError, Result, RunError};
pub use markdown::{MarkdownConverter, MarkupConverter};
pub use package::{deliver, Delivered, DeckWriter};
pub use parser::parse;
pub use pipeline::{build_deck, diagnostic_deck, BuildOptions, BuildOutcome, BuildReport, Deck, RejectedCard};
pub use render::{Behavior, NoteFields, NoteModel, RenderStats, RenderedNote, Renderer};
pub use style::{BuiltinStyles, DeckStyle, StyleSource};
pub use types::{Card, CardContent, CardType, MaskedArea, RawCard};
pub use validator::{validate, Correction, Validated};
