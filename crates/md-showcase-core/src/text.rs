use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::text::Span;

/// Turns source code into styled spans, one `Vec` per input line.
///
/// Backends only have to implement [`CodeHighlighter::highlight_lines`]; the output must contain
/// exactly one entry per input line so callers can index it by line number.
pub trait CodeHighlighter {
    fn highlight_lines(&self, language: Option<&str>, lines: &[&str]) -> Vec<Vec<Span<'static>>>;

    fn highlight_text(&self, language: Option<&str>, text: &str) -> Vec<Vec<Span<'static>>> {
        let lines: Vec<&str> = text.split('\n').collect();
        self.highlight_lines(language, &lines)
    }

    /// Background colour of the highlighting theme, if it has one.
    fn background_color(&self) -> Option<Color> {
        None
    }

    fn highlight_line(&self, language: Option<&str>, line: &str) -> Vec<Span<'static>> {
        self.highlight_lines(language, &[line])
            .into_iter()
            .next()
            .unwrap_or_default()
    }
}

pub struct NoHighlight;

impl CodeHighlighter for NoHighlight {
    fn highlight_lines(&self, _language: Option<&str>, lines: &[&str]) -> Vec<Vec<Span<'static>>> {
        lines
            .iter()
            .map(|l| vec![Span::styled((*l).to_string(), Style::default())])
            .collect()
    }
}

/// Concatenates span contents, dropping styles.
pub fn spans_to_plain(spans: &[Span<'_>]) -> String {
    let mut out = String::new();
    for s in spans {
        out.push_str(s.content.as_ref());
    }
    out
}
