//! Deck stylesheet selection.
//!
//! The stylesheet is resolved once per run into an immutable [`DeckStyle`]
//! and handed to whatever assembles the package.

use serde::{Deserialize, Serialize};

/// Supplies stylesheet text by style identifier.
pub trait StyleSource {
    fn stylesheet(&self, name: &str) -> Option<String>;
}

/// Style name used when the requested one is unknown.
pub const DEFAULT_STYLE: &str = "default";

/// Stylesheet chosen for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStyle {
    pub name: String,
    pub css: String,
}

impl DeckStyle {
    /// Look up `name`, falling back to the default style, and append any custom CSS.
    pub fn resolve(source: &dyn StyleSource, name: &str, custom_css: Option<&str>) -> Self {
        let (name, mut css) = match source.stylesheet(name) {
            Some(css) => (name.to_string(), css),
            None => {
                tracing::warn!(style = name, "unknown card style, using {DEFAULT_STYLE}");
                (
                    DEFAULT_STYLE.to_string(),
                    source.stylesheet(DEFAULT_STYLE).unwrap_or_default(),
                )
            }
        };

        if let Some(extra) = custom_css.map(str::trim).filter(|c| !c.is_empty()) {
            if !css.is_empty() && !css.ends_with('\n') {
                css.push('\n');
            }
            css.push_str("/* Custom CSS */\n");
            css.push_str(extra);
            css.push('\n');
        }

        Self { name, css }
    }
}

/// Stylesheets bundled with the library.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinStyles;

impl BuiltinStyles {
    pub const NAMES: [&'static str; 3] = ["default", "retro", "minimal"];
}

impl StyleSource for BuiltinStyles {
    fn stylesheet(&self, name: &str) -> Option<String> {
        let palette = match name {
            "default" => DEFAULT_PALETTE,
            "retro" => RETRO_PALETTE,
            "minimal" => MINIMAL_PALETTE,
            _ => return None,
        };
        Some(format!("{palette}\n{STRUCTURE}"))
    }
}

const DEFAULT_PALETTE: &str = r#".card { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; background: #f5f6f7; color: #2c3e50; }
.content { background: #ffffff; border-radius: 12px; box-shadow: 0 4px 6px rgba(0, 0, 0, 0.05); }
.category { color: #7f8c9c; border-bottom: 2px solid #3498db; }"#;

const RETRO_PALETTE: &str = r#".card { font-family: 'VT323', 'Courier New', monospace; background: #fdfd96; color: #222222; }
.content { background: #ffffff; border: 4px solid #000; box-shadow: 12px 12px 0 #ff6b6b; }
.category { color: #ff6b6b; border-bottom: 4px solid #000; }"#;

const MINIMAL_PALETTE: &str = r#".card { font-family: 'Inter', -apple-system, sans-serif; background: #ffffff; color: inherit; }
.content { background: transparent; border: none; box-shadow: none; }
.category { color: #999999; border-bottom: 1px solid #e0e0e0; }"#;

/// Layout shared by every palette: the classes the renderer emits.
const STRUCTURE: &str = r#".card { line-height: 1.6; padding: 1rem; }
.content { max-width: 800px; margin: 0 auto; padding: 2rem; }
.category { font-size: 0.85em; text-transform: uppercase; letter-spacing: 0.05em; margin-bottom: 1.5rem; }
.mcq-section { display: flex; flex-direction: column; max-width: 600px; margin: 20px auto; }
.mcq-option { border: 2px solid #dfe3e8; border-radius: 8px; margin: 6px 0; padding: 10px 14px; cursor: pointer; }
.mcq-option-content { display: flex; justify-content: space-between; }
.opt-correct { border-color: #2ecc71; background: rgba(46, 204, 113, 0.1); }
.opt-incorrect { border-color: #e74c3c; background: rgba(231, 76, 60, 0.05); }
.true-false-container { display: flex; gap: 1rem; justify-content: center; margin-top: 1.5rem; }
.tf-button { min-width: 100px; padding: 10px 20px; border: 2px solid currentColor; text-align: center; cursor: pointer; }
.image-occlusion-container { position: relative; }
.occlusion-rect { position: absolute; background-color: black; }
.tags-container .tag { font-size: 0.75em; margin-right: 0.5em; opacity: 0.7; }
.error { color: red; }"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_styles_resolve_by_name() {
        for name in BuiltinStyles::NAMES {
            let style = DeckStyle::resolve(&BuiltinStyles, name, None);
            assert_eq!(style.name, name);
            assert!(style.css.contains(".mcq-option"));
        }
    }

    #[test]
    fn unknown_style_falls_back_to_default() {
        let style = DeckStyle::resolve(&BuiltinStyles, "neon", None);
        assert_eq!(style.name, DEFAULT_STYLE);
        assert_eq!(Some(style.css), BuiltinStyles.stylesheet(DEFAULT_STYLE));
    }

    #[test]
    fn custom_css_is_appended() {
        let style = DeckStyle::resolve(&BuiltinStyles, "minimal", Some(".card { color: red; }"));
        assert!(style.css.ends_with("/* Custom CSS */\n.card { color: red; }\n"));
        assert!(style.css.starts_with(".card { font-family: 'Inter'"));
    }
}
