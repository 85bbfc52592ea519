//! Code syntax highlighting using syntect.

use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::traits::{BlockRenderer, RenderFailure};

/// Theme used when none is configured or the configured one is missing.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Highlights code fences into inline-styled HTML.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl SyntectHighlighter {
    /// Create a highlighter with one of syntect's bundled themes.
    pub fn new(theme_name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;

        let theme = match themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                tracing::warn!(
                    "Unknown highlight theme '{}', using {}",
                    theme_name,
                    DEFAULT_THEME
                );
                themes.remove(DEFAULT_THEME).unwrap_or_default()
            }
        };

        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

impl BlockRenderer for SyntectHighlighter {
    fn name(&self) -> &'static str {
        "syntect"
    }

    fn render(&self, token: &str, source: &str) -> Result<String, RenderFailure> {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(token)
            .ok_or_else(|| RenderFailure::Unsupported(token.to_string()))?;

        highlighted_html_for_string(source, &self.syntaxes, syntax, &self.theme)
            .map_err(|e| RenderFailure::Failed(e.to_string()))
    }
}
