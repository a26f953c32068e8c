pub mod cli;
pub mod config;
pub mod error;
pub mod writer;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use flashcard_core::{build_deck, deliver, BuildOptions, BuildReport, BuiltinStyles, DeckStyle, MarkdownConverter, RunError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::writer::JsonDeckWriter;

/// What one invocation produced.
#[derive(Debug)]
pub struct RunSummary {
    pub report: BuildReport,
    pub path: PathBuf,
    /// Set when the diagnostic deck was written in place of the real one.
    pub failure: Option<RunError>,
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `debug`.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Build the deck described by `config` and write it.
///
/// A failed build still produces a file: the error recovery deck. Only a
/// failure to write that deck, or to read the note, is returned as an error.
pub fn run(config: &Config) -> anyhow::Result<RunSummary> {
    tracing::info!(note = %config.note_path.display(), deck = %config.deck_name, "building deck");

    let content = fs::read_to_string(&config.note_path)
        .with_context(|| format!("Failed to read note {}", config.note_path.display()))?;

    let style = DeckStyle::resolve(&BuiltinStyles, &config.card_style, config.custom_css.as_deref());
    let options = BuildOptions {
        deck_name: config.deck_name.clone(),
        global_tags: config.global_tags.clone(),
        style: style.clone(),
        dedupe: config.dedupe,
    };

    let outcome = build_deck(&content, &options, MarkdownConverter);
    let report = outcome.report.clone();
    println!("{}", report.summary_line());

    let delivered = deliver(&JsonDeckWriter, outcome, &config.deck_folder, &config.deck_name, &style)
        .context("Failed to write error recovery deck")?;

    match &delivered.failure {
        None => println!("Deck written to {}", delivered.path.display()),
        Some(failure) => println!(
            "Deck creation failed ({failure}); error recovery deck written to {}",
            delivered.path.display()
        ),
    }

    Ok(RunSummary {
        report,
        path: delivered.path,
        failure: delivered.failure,
    })
}
