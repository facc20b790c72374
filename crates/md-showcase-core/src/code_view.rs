use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Span;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;
use unicode_width::UnicodeWidthStr;

use crate::code_render::digits;
use crate::input::InputEvent;
use crate::input::MouseEventKind;
use crate::render;
use crate::scroll::ScrollBindings;
use crate::text::CodeHighlighter;
use crate::theme::Theme;
use crate::viewport::ViewportState;

#[derive(Clone, Debug)]
pub struct CodeViewOptions {
    pub show_line_numbers: bool,
    pub show_scrollbar: bool,
    /// Paint the highlighter's theme background behind the code, when it has one.
    pub use_highlighter_background: bool,
    pub scroll: ScrollBindings,
}

impl Default for CodeViewOptions {
    fn default() -> Self {
        Self {
            show_line_numbers: true,
            show_scrollbar: true,
            use_highlighter_background: true,
            scroll: ScrollBindings::default(),
        }
    }
}

#[derive(Clone, Debug)]
struct HighlightCache {
    hash: u64,
    spans: Arc<Vec<Vec<Span<'static>>>>,
}

/// A scrollable, read-only code viewer.
///
/// The whole snippet is highlighted in one call (so the highlighter keeps its parse state
/// across lines) and cached until the code, language or highlighter changes.
#[derive(Clone, Default)]
pub struct CodeView {
    lines: Vec<String>,
    max_content_width: u32,
    pub state: ViewportState,
    options: CodeViewOptions,
    highlighter: Option<Arc<dyn CodeHighlighter + Send + Sync>>,
    language: Option<String>,
    highlight_cache: Option<HighlightCache>,
}

impl CodeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CodeViewOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &CodeViewOptions {
        &self.options
    }

    pub fn set_highlighter(&mut self, highlighter: Option<Arc<dyn CodeHighlighter + Send + Sync>>) {
        self.highlighter = highlighter;
        self.highlight_cache = None;
    }

    pub fn set_language(&mut self, language: Option<impl Into<String>>) {
        self.language = language.map(Into::into);
        self.highlight_cache = None;
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Replaces the code. Lines are kept verbatim, including leading and trailing blank lines.
    pub fn set_code(&mut self, code: &str) {
        let lines = code.split('\n').map(normalize_tabs).collect::<Vec<_>>();
        self.set_lines(lines);
    }

    pub fn set_lines(&mut self, mut lines: Vec<String>) {
        for l in &mut lines {
            if l.ends_with('\r') {
                l.pop();
            }
            if l.contains('\t') {
                *l = normalize_tabs(l);
            }
        }

        self.max_content_width = lines
            .iter()
            .map(|l| UnicodeWidthStr::width(l.as_str()) as u32)
            .max()
            .unwrap_or(0);
        let h = lines.len() as u32;
        self.lines = lines;
        self.highlight_cache = None;
        self.state.set_content(self.max_content_width, h);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of rows needed to show every line without scrolling.
    pub fn content_height(&self) -> u16 {
        self.lines.len().min(u16::MAX as usize) as u16
    }

    pub fn scroll_y_by(&mut self, delta: i32) {
        self.state.scroll_y_by(delta);
    }

    pub fn scroll_x_by(&mut self, delta: i32) {
        self.state.scroll_x_by(delta);
    }

    /// Applies scroll keys and mouse wheel events. Returns `true` when a redraw is needed.
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Key(key) => {
                let Some(action) = self.options.scroll.action_for(key) else {
                    return false;
                };
                self.options.scroll.apply(&mut self.state, action);
                true
            }
            InputEvent::Mouse(m) => {
                let step = self.options.scroll.wheel_step;
                match m.kind {
                    MouseEventKind::ScrollUp => self.state.scroll_y_by(-step),
                    MouseEventKind::ScrollDown => self.state.scroll_y_by(step),
                }
                true
            }
            InputEvent::Resize(..) => false,
        }
    }

    fn gutter_width(&self) -> u16 {
        if self.options.show_line_numbers {
            digits(self.lines.len()).saturating_add(1) as u16
        } else {
            0
        }
    }

    fn split_area(&self, area: Rect) -> (Rect, Option<u16>) {
        if self.options.show_scrollbar && area.width >= 2 {
            (
                Rect::new(area.x, area.y, area.width - 1, area.height),
                Some(area.x + area.width - 1),
            )
        } else {
            (area, None)
        }
    }

    pub fn set_viewport(&mut self, area: Rect) {
        let (content_area, _) = self.split_area(area);
        let viewport_w = content_area.width.saturating_sub(self.gutter_width());
        self.state.set_viewport(viewport_w, content_area.height);
    }

    /// Base style for code cells: the theme text style, over the highlighter background if any.
    pub fn base_style(&self, theme: &Theme) -> Style {
        let bg = if self.options.use_highlighter_background {
            self.highlighter.as_ref().and_then(|h| h.background_color())
        } else {
            None
        };
        match bg {
            Some(bg) => theme.text_primary.bg(bg),
            None => theme.text_primary,
        }
    }

    pub fn render_ref(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        self.set_viewport(area);
        let (content_area, scrollbar_x) = self.split_area(area);
        let gutter_w = self.gutter_width().min(content_area.width);
        let content_w = content_area.width.saturating_sub(gutter_w);
        let base = self.base_style(theme);
        let gutter_style = base.patch(theme.text_muted);

        let highlighted = if content_w > 0 {
            self.highlight_cached()
        } else {
            None
        };

        for row in 0..content_area.height {
            let y = content_area.y + row;
            let idx = (self.state.y as usize).saturating_add(row as usize);

            buf.set_style(Rect::new(content_area.x, y, content_area.width, 1), base);

            if gutter_w > 0 {
                let lineno = if idx < self.lines.len() {
                    format!(
                        "{:>width$} ",
                        idx + 1,
                        width = (gutter_w as usize).saturating_sub(1)
                    )
                } else {
                    " ".repeat(gutter_w as usize)
                };
                buf.set_stringn(
                    content_area.x,
                    y,
                    lineno,
                    content_area.width as usize,
                    gutter_style,
                );
            }

            if content_w == 0 {
                continue;
            }
            let Some(line) = self.lines.get(idx) else {
                continue;
            };

            let spans = highlighted
                .as_ref()
                .and_then(|h| h.get(idx))
                .cloned()
                .unwrap_or_else(|| vec![Span::styled(line.clone(), base)]);

            render::render_spans_clipped(
                content_area.x + gutter_w,
                y,
                self.state.x,
                content_w,
                buf,
                &spans,
                base,
            );
        }

        if let Some(sb_x) = scrollbar_x {
            render::render_scrollbar(
                Rect::new(sb_x, area.y, 1, area.height),
                buf,
                &self.state,
                theme.text_muted,
            );
        }
    }

    fn highlight_cached(&mut self) -> Option<Arc<Vec<Vec<Span<'static>>>>> {
        let highlighter = self.highlighter.as_ref()?;
        let hash = compute_hash(self.language.as_deref(), &self.lines);
        if let Some(cache) = self.highlight_cache.as_ref()
            && cache.hash == hash
        {
            return Some(cache.spans.clone());
        }

        let slice = self.lines.iter().map(String::as_str).collect::<Vec<_>>();
        let spans = Arc::new(highlighter.highlight_lines(self.language.as_deref(), &slice));
        self.highlight_cache = Some(HighlightCache {
            hash,
            spans: spans.clone(),
        });
        Some(spans)
    }
}

fn compute_hash(language: Option<&str>, lines: &[String]) -> u64 {
    let mut h = DefaultHasher::new();
    language.hash(&mut h);
    lines.hash(&mut h);
    h.finish()
}

fn normalize_tabs(s: &str) -> String {
    if s.contains('\t') {
        s.replace('\t', &" ".repeat(render::TAB_WIDTH))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap;
    use crate::text::NoHighlight;
    use pretty_assertions::assert_eq;
    use ratatui::style::Color;

    fn rows(buf: &Buffer) -> Vec<String> {
        (0..buf.area.height)
            .map(|y| render::buffer_row_text(buf, y))
            .collect()
    }

    #[test]
    fn code_view_renders_without_panic() {
        let mut v = CodeView::new();
        v.set_code("fn main() {\n\tprintln!(\"hi\");\n}\n");
        let theme = Theme::default();
        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 3));
        v.render_ref(Rect::new(0, 0, 20, 3), &mut buf, &theme);
        for w in 0..4 {
            let mut buf = Buffer::empty(Rect::new(0, 0, w, 2));
            v.render_ref(Rect::new(0, 0, w, 2), &mut buf, &theme);
        }
    }

    #[test]
    fn keeps_leading_and_trailing_blank_lines() {
        let mut v = CodeView::new();
        v.set_code("\n  a\n  ");
        assert_eq!(v.lines(), &["", "  a", "  "]);
        assert_eq!(v.content_height(), 3);
    }

    #[test]
    fn renders_gutter_and_code() {
        let mut v = CodeView::with_options(CodeViewOptions {
            show_scrollbar: false,
            ..CodeViewOptions::default()
        });
        v.set_highlighter(Some(Arc::new(NoHighlight)));
        v.set_code("let a;\nlet b;");
        let mut buf = Buffer::empty(Rect::new(0, 0, 12, 2));
        v.render_ref(Rect::new(0, 0, 12, 2), &mut buf, &Theme::default());
        assert_eq!(rows(&buf), vec!["1 let a;", "2 let b;"]);
    }

    #[test]
    fn scroll_keys_move_viewport() {
        let mut v = CodeView::new();
        v.set_code("1\n2\n3\n4\n5");
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 2));
        v.render_ref(Rect::new(0, 0, 10, 2), &mut buf, &Theme::default());
        assert!(v.handle_event(&InputEvent::Key(keymap::key_char('G'))));
        assert_eq!(v.state.y, 3);
        assert!(!v.handle_event(&InputEvent::Key(keymap::key_char('z'))));
    }

    #[test]
    fn paints_highlighter_background() {
        struct Light;
        impl CodeHighlighter for Light {
            fn highlight_lines(
                &self,
                language: Option<&str>,
                lines: &[&str],
            ) -> Vec<Vec<Span<'static>>> {
                NoHighlight.highlight_lines(language, lines)
            }
            fn background_color(&self) -> Option<Color> {
                Some(Color::Rgb(248, 248, 255))
            }
        }

        let mut v = CodeView::new();
        v.set_highlighter(Some(Arc::new(Light)));
        v.set_code("x");
        let mut buf = Buffer::empty(Rect::new(0, 0, 6, 1));
        v.render_ref(Rect::new(0, 0, 6, 1), &mut buf, &Theme::default());
        let cell = buf.cell((3, 0)).expect("cell");
        assert_eq!(cell.bg, Color::Rgb(248, 248, 255));
    }
}
