//! Shared fixtures for end-to-end runs.

use std::fs;
use std::path::PathBuf;

use flashcard_maker::config::Config;
use tempfile::TempDir;

/// A note with one card of each shape plus one broken cloze card.
pub const MIXED_NOTE: &str = r#"# Geography

<!-- Anki Card -->
<!-- type: basic -->
<!-- front -->
What is 2+2?
<!-- back -->
4
<!-- tags: math -->

<!-- Anki Card -->
<!-- type: mcq -->
<!-- front -->
Capital of France?
<!-- options -->
London
Paris <!-- correct -->
Berlin
<!-- back -->
Paris has been the capital since 987.
<!-- tags: geography -->

<!-- Anki Card -->
<!-- type: cloze -->
<!-- front -->
The capital of France is {{Paris}}.

<!-- Anki Card -->
<!-- type: true-false -->
<!-- front -->
The Seine flows through Paris.
<!-- back -->
true, it does.

<!-- Anki Card -->
<!-- type: fill-in-the-blank -->
<!-- front -->
The Eiffel Tower is in ___.
<!-- back -->
Paris

<!-- Anki Card -->
<!-- type: cloze -->
<!-- front -->
This cloze has no markers.
"#;

/// Temp workspace holding a note and an output folder.
pub struct TestContext {
    pub dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("decks")
    }

    /// Write `content` as the note and build a config around it.
    pub fn config(&self, content: &str, deck_name: &str) -> Config {
        let note_path = self.dir.path().join("notes.md");
        fs::write(&note_path, content).expect("Failed to write note");
        Config {
            note_path,
            deck_folder: self.out_dir(),
            deck_name: deck_name.to_string(),
            global_tags: vec!["deck".to_string()],
            card_style: "default".to_string(),
            custom_css: None,
            dedupe: true,
            debug: false,
        }
    }

    pub fn read_json(&self, path: &std::path::Path) -> serde_json::Value {
        let text = fs::read_to_string(path).expect("Failed to read deck");
        serde_json::from_str(&text).expect("Deck is not valid JSON")
    }
}
