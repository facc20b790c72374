//! The two leaves of the showcase: a heading line above a scrollable body, inside a border.

use md_showcase_core::code_view::CodeView;
use md_showcase_core::code_view::CodeViewOptions;
use md_showcase_core::input::InputEvent;
use md_showcase_core::render;
use md_showcase_core::text::CodeHighlighter;
use md_showcase_core::theme::Theme;
use md_showcase_markdown::MarkdownView;
use md_showcase_markdown::MarkdownViewOptions;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Widget;
use std::sync::Arc;
use tracing::debug;

use crate::content::CODE_HEADING;
use crate::content::CODE_LANGUAGE;
use crate::content::CODE_SAMPLE;
use crate::content::MARKDOWN_HEADING;
use crate::content::MARKDOWN_TEXT;

/// Rows taken by the border and the heading line.
const CHROME_ROWS: u16 = 3;

/// Draws the border and heading, returning the area left for the body.
fn render_frame(
    area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
    focused: bool,
    heading: &'static str,
    level: u8,
) -> Option<Rect> {
    if area.width < 2 || area.height < 2 {
        return None;
    }
    let border_style = if focused {
        theme.border_focused
    } else {
        theme.border
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(area);
    block.render(area, buf);
    if inner.width == 0 || inner.height == 0 {
        return None;
    }

    render::render_str_clipped(
        inner.x,
        inner.y,
        0,
        inner.width,
        buf,
        heading,
        theme.text_primary.patch(theme.heading_style(level)),
    );
    Some(Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height - 1,
    ))
}

pub struct MarkdownSection {
    view: MarkdownView,
}

impl MarkdownSection {
    pub fn new(options: MarkdownViewOptions) -> Self {
        let mut view = MarkdownView::with_options(options);
        view.set_markdown(MARKDOWN_TEXT);
        Self { view }
    }

    pub fn view(&self) -> &MarkdownView {
        &self.view
    }

    pub fn render_ref(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme, focused: bool) {
        if let Some(body) = render_frame(area, buf, theme, focused, MARKDOWN_HEADING, 1) {
            self.view.render_ref(body, buf, theme);
        }
    }

    /// Rows needed to show the section in full at `width` columns.
    pub fn preferred_height(&mut self, width: u16, theme: &Theme) -> u16 {
        let body = self.view.content_height(width.saturating_sub(2), theme);
        body.saturating_add(CHROME_ROWS)
    }

    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        self.view.handle_event(event)
    }
}

pub struct CodeSection {
    view: CodeView,
}

impl CodeSection {
    pub fn new(
        options: CodeViewOptions,
        highlighter: Option<Arc<dyn CodeHighlighter + Send + Sync>>,
    ) -> Self {
        let mut view = CodeView::with_options(options);
        view.set_highlighter(highlighter);
        view.set_language(Some(CODE_LANGUAGE));
        view.set_code(CODE_SAMPLE);
        debug!(
            language = CODE_LANGUAGE,
            lines = view.lines().len(),
            "loaded code sample"
        );
        Self { view }
    }

    pub fn view(&self) -> &CodeView {
        &self.view
    }

    pub fn render_ref(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme, focused: bool) {
        if let Some(body) = render_frame(area, buf, theme, focused, CODE_HEADING, 2) {
            self.view.render_ref(body, buf, theme);
        }
    }

    pub fn preferred_height(&self) -> u16 {
        self.view.content_height().saturating_add(CHROME_ROWS)
    }

    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        self.view.handle_event(event)
    }
}
