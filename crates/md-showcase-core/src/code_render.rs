use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use unicode_width::UnicodeWidthStr;

use crate::text::CodeHighlighter;
use crate::text::spans_to_plain;

/// Layout options for [`render_code_lines`].
#[derive(Clone, Debug)]
pub struct CodeRenderOptions {
    /// Whether to show 1-based line numbers.
    pub show_line_numbers: bool,
    /// The line number of the first rendered line (1-based).
    pub line_number_start: usize,
    /// Separator after the line number gutter (e.g. `" │ "`).
    pub line_number_separator: &'static str,
    /// Blank columns inserted before every line (after the gutter).
    pub indent: u16,
}

impl Default for CodeRenderOptions {
    fn default() -> Self {
        Self {
            show_line_numbers: false,
            line_number_start: 1,
            line_number_separator: " │ ",
            indent: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CodeRenderStyles {
    /// Base style applied to code spans (patched onto highlight styles).
    pub base: Style,
    /// Style used for the line number gutter.
    pub gutter: Style,
}

#[derive(Clone, Debug)]
pub struct RenderedCode {
    pub lines: Vec<Line<'static>>,
    /// Maximum display width (in terminal cells) across all rendered lines.
    pub content_width: u32,
    pub content_height: u32,
}

/// Renders code lines into styled [`Line`]s, optionally using a [`CodeHighlighter`].
///
/// This is a render core without viewport state or scrolling. When a highlighter is given it is
/// called once for the whole block (lines joined with `\n`), so multi-line constructs such as
/// block comments and template literals keep their state across lines.
pub fn render_code_lines<S: AsRef<str>>(
    lines: &[S],
    language: Option<&str>,
    highlighter: Option<&dyn CodeHighlighter>,
    styles: CodeRenderStyles,
    options: CodeRenderOptions,
) -> RenderedCode {
    if lines.is_empty() {
        return RenderedCode {
            lines: vec![Line::from(vec![Span::styled(String::new(), styles.base)])],
            content_width: 0,
            content_height: 1,
        };
    }

    let line_number_w = if options.show_line_numbers {
        digits(
            options
                .line_number_start
                .saturating_add(lines.len().saturating_sub(1)),
        )
    } else {
        0
    };

    let highlighted = highlighter.map(|hi| {
        let text = lines
            .iter()
            .map(|l| l.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        hi.highlight_text(language, &text)
    });

    let mut out: Vec<Line<'static>> = Vec::with_capacity(lines.len());
    let mut max_w = 0u32;

    for (idx, raw) in lines.iter().enumerate() {
        let mut spans: Vec<Span<'static>> = Vec::new();

        if options.show_line_numbers {
            let n = options.line_number_start.saturating_add(idx);
            let gutter = format!(
                "{n:>width$}{}",
                options.line_number_separator,
                width = line_number_w
            );
            spans.push(Span::styled(gutter, styles.gutter));
        }
        if options.indent > 0 {
            spans.push(Span::styled(
                " ".repeat(options.indent as usize),
                styles.base,
            ));
        }

        let mut code_spans = highlighted
            .as_ref()
            .and_then(|h| h.get(idx).cloned())
            .unwrap_or_else(|| vec![Span::styled(raw.as_ref().to_string(), styles.base)]);
        for s in &mut code_spans {
            s.style = styles.base.patch(s.style);
        }
        spans.extend(code_spans);

        max_w = max_w.max(UnicodeWidthStr::width(spans_to_plain(&spans).as_str()) as u32);
        out.push(Line::from(spans));
    }

    RenderedCode {
        content_width: max_w,
        content_height: out.len() as u32,
        lines: out,
    }
}

pub fn digits(mut n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    let mut d = 0;
    while n > 0 {
        n /= 10;
        d += 1;
    }
    d
}
