use md_showcase_core::text::CodeHighlighter;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Span;
use syntect::easy::HighlightLines;
use syntect::highlighting::FontStyle;
use syntect::highlighting::Style as SynStyle;
use syntect::highlighting::Theme;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxReference;
use syntect::parsing::SyntaxSet;
use tracing::debug;
use tracing::warn;

use crate::error::SyntaxError;

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Style names from web highlighters mapped onto the closest bundled syntect theme.
const THEME_ALIASES: &[(&str, &str)] = &[
    ("docco", "InspiredGitHub"),
    ("github", "InspiredGitHub"),
    ("vsc-dark-plus", "base16-ocean.dark"),
    ("vscDarkPlus", "base16-ocean.dark"),
    ("solarized-light", "Solarized (light)"),
    ("solarized-dark", "Solarized (dark)"),
];

const LANGUAGE_ALIASES: &[(&str, &str)] = &[("jsx", "js"), ("mjs", "js"), ("cjs", "js")];

/// Maps a theme alias to the bundled theme name. Unknown names pass through unchanged.
pub fn resolve_theme_name(name: &str) -> &str {
    THEME_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|(_, theme)| *theme)
        .unwrap_or(name)
}

pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
    theme_name: String,
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let mut theme_set = ThemeSet::load_defaults();
        let (theme_name, theme) = match theme_set.themes.remove(DEFAULT_THEME) {
            Some(theme) => (DEFAULT_THEME.to_string(), theme),
            None => theme_set
                .themes
                .into_iter()
                .next()
                .unwrap_or_else(|| (String::new(), Theme::default())),
        };
        Self {
            syntax_set,
            theme,
            theme_name,
        }
    }

    /// Builds a highlighter using the bundled theme `name` (or one of its aliases, e.g. `docco`).
    pub fn with_theme(name: &str) -> Result<Self, SyntaxError> {
        let resolved = resolve_theme_name(name);
        let mut theme_set = ThemeSet::load_defaults();
        let Some(theme) = theme_set.themes.remove(resolved) else {
            let mut available = theme_set.themes.keys().cloned().collect::<Vec<_>>();
            available.extend(THEME_ALIASES.iter().map(|(alias, _)| alias.to_string()));
            available.sort();
            return Err(SyntaxError::UnknownTheme {
                name: name.to_string(),
                available,
            });
        };
        debug!(requested = name, theme = resolved, "loaded highlighting theme");
        Ok(Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            theme_name: resolved.to_string(),
        })
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Names of the bundled themes, sorted.
    pub fn available_themes() -> Vec<String> {
        let mut names = ThemeSet::load_defaults()
            .themes
            .into_keys()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn syntax_name(&self, language: Option<&str>) -> &str {
        &self.syntax_for(language).name
    }

    fn syntax_for(&self, language: Option<&str>) -> &SyntaxReference {
        if let Some(lang) = language.map(str::trim).filter(|l| !l.is_empty()) {
            let lang = LANGUAGE_ALIASES
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(lang))
                .map(|(_, target)| *target)
                .unwrap_or(lang);
            if let Some(syntax) = self.syntax_set.find_syntax_by_extension(lang) {
                return syntax;
            }
            if let Some(syntax) = self.syntax_set.find_syntax_by_token(lang) {
                return syntax;
            }
            debug!(language = lang, "no grammar found, falling back to plain text");
        }
        self.syntax_set.find_syntax_plain_text()
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeHighlighter for SyntectHighlighter {
    fn highlight_lines(&self, language: Option<&str>, lines: &[&str]) -> Vec<Vec<Span<'static>>> {
        let syntax = self.syntax_for(language);
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let mut out: Vec<Vec<Span<'static>>> = Vec::with_capacity(lines.len());
        let mut line_buf = String::new();
        for line in lines {
            // The newline-aware grammars need the terminator to close line-scoped tokens.
            line_buf.clear();
            line_buf.push_str(line);
            line_buf.push('\n');

            let regions = match highlighter.highlight_line(&line_buf, &self.syntax_set) {
                Ok(regions) => regions,
                Err(err) => {
                    warn!(%err, "syntect failed to highlight line");
                    Vec::new()
                }
            };

            let mut spans: Vec<Span<'static>> = Vec::new();
            for (style, s) in regions {
                let s = s.strip_suffix('\n').unwrap_or(s);
                if s.is_empty() {
                    continue;
                }
                spans.push(Span::styled(s.to_string(), syn_style_to_ratatui(style)));
            }
            if spans.is_empty() {
                spans.push(Span::raw((*line).to_string()));
            }
            out.push(spans);
        }
        out
    }

    fn background_color(&self) -> Option<Color> {
        self.theme
            .settings
            .background
            .map(|c| Color::Rgb(c.r, c.g, c.b))
    }
}

fn syn_style_to_ratatui(s: SynStyle) -> Style {
    let mut out = Style::default().fg(Color::Rgb(s.foreground.r, s.foreground.g, s.foreground.b));

    if s.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if s.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if s.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_showcase_core::text::spans_to_plain;
    use pretty_assertions::assert_eq;

    #[test]
    fn highlights_without_panicking() {
        let h = SyntectHighlighter::new();
        let spans = h.highlight_line(Some("rs"), "fn main() {}");
        assert_eq!(spans_to_plain(&spans), "fn main() {}");

        let many = h.highlight_lines(Some("rs"), &["fn main() {", "}", ""]);
        assert_eq!(many.len(), 3);
    }

    #[test]
    fn resolves_javascript_by_name_and_alias() {
        let h = SyntectHighlighter::new();
        assert_eq!(h.syntax_name(Some("javascript")), "JavaScript");
        assert_eq!(h.syntax_name(Some("jsx")), "JavaScript");
        assert_eq!(h.syntax_name(Some("js")), "JavaScript");
        assert_eq!(h.syntax_name(Some("no-such-language")), "Plain Text");
        assert_eq!(h.syntax_name(None), "Plain Text");
    }

    #[test]
    fn javascript_keywords_get_their_own_colour() {
        let h = SyntectHighlighter::new();
        let spans = h.highlight_line(Some("javascript"), "function App() {");
        assert_eq!(spans_to_plain(&spans), "function App() {");
        let mut styles = spans.iter().map(|s| s.style).collect::<Vec<_>>();
        styles.dedup();
        assert!(styles.len() > 1, "expected several styles, got {styles:?}");
    }

    #[test]
    fn docco_alias_selects_light_theme_with_background() {
        let h = SyntectHighlighter::with_theme("docco").expect("theme exists");
        assert_eq!(h.theme_name(), "InspiredGitHub");
        assert!(h.background_color().is_some());
    }

    #[test]
    fn unknown_theme_lists_alternatives() {
        let err = SyntectHighlighter::with_theme("nope").err().expect("error");
        let SyntaxError::UnknownTheme { name, available } = &err;
        assert_eq!(name, "nope");
        assert!(available.iter().any(|t| t == "InspiredGitHub"));
        assert!(available.iter().any(|t| t == "docco"));
        assert!(err.to_string().contains("unknown highlighting theme `nope`"));
    }

    #[test]
    fn bundled_themes_cover_aliases() {
        let names = SyntectHighlighter::available_themes();
        for (_, target) in THEME_ALIASES {
            assert!(names.iter().any(|n| n == target), "missing {target}");
        }
    }
}
