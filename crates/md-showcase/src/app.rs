//! The root container: both sections stacked top to bottom above a help bar.

use md_showcase_core::help::HelpBar;
use md_showcase_core::help::HelpBarOptions;
use md_showcase_core::input::InputEvent;
use md_showcase_core::input::KeyCode;
use md_showcase_core::input::KeyEvent;
use md_showcase_core::input::MouseEvent;
use md_showcase_core::keymap;
use md_showcase_core::keymap::Binding;
use md_showcase_core::render::buffer_row_text;
use md_showcase_core::text::CodeHighlighter;
use md_showcase_core::theme::Theme;
use md_showcase_syntax::syntect::SyntectHighlighter;
use ratatui::buffer::Buffer;
use ratatui::layout::Constraint;
use ratatui::layout::Direction;
use ratatui::layout::Layout;
use ratatui::layout::Position;
use ratatui::layout::Rect;
use ratatui::style::Style;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::ShowcaseError;
use crate::sections::CodeSection;
use crate::sections::MarkdownSection;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Markdown,
    Code,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Markdown => Focus::Code,
            Focus::Code => Focus::Markdown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppAction {
    None,
    Redraw,
    Quit,
}

pub struct App {
    theme: Theme,
    markdown: MarkdownSection,
    code: CodeSection,
    focus: Focus,
    help: HelpBar,
    quit: Binding,
    focus_next: Binding,
    markdown_area: Rect,
    code_area: Rect,
}

impl App {
    /// Builds the showcase with a `syntect` highlighter for the configured theme.
    pub fn new(config: &Config) -> Result<Self, ShowcaseError> {
        let highlighter = SyntectHighlighter::with_theme(&config.code.theme)?;
        Ok(Self::with_highlighter(config, Some(Arc::new(highlighter))))
    }

    pub fn with_highlighter(
        config: &Config,
        highlighter: Option<Arc<dyn CodeHighlighter + Send + Sync>>,
    ) -> Self {
        let theme = Theme::default();
        let quit = Binding::new(
            "q",
            "quit",
            vec![
                keymap::key_char('q'),
                keymap::key(KeyCode::Esc),
                keymap::key_ctrl('c'),
            ],
        );
        let focus_next = Binding::new(
            "tab",
            "focus",
            vec![keymap::key(KeyCode::Tab), keymap::key(KeyCode::BackTab)],
        );
        let scroll = Binding::new("j/k", "scroll", Vec::new());
        let jump = Binding::new("g/G", "top/bottom", Vec::new());
        let help = HelpBar::with_options(
            vec![quit.clone(), focus_next.clone(), scroll, jump],
            HelpBarOptions {
                style: theme.text_muted,
                key_style: theme.accent,
                ..HelpBarOptions::default()
            },
        );

        Self {
            markdown: MarkdownSection::new(config.markdown_options()),
            code: CodeSection::new(config.code_options(), highlighter),
            theme,
            focus: Focus::default(),
            help,
            quit,
            focus_next,
            markdown_area: Rect::default(),
            code_area: Rect::default(),
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn markdown(&self) -> &MarkdownSection {
        &self.markdown
    }

    pub fn code(&self) -> &CodeSection {
        &self.code
    }

    pub fn handle_event(&mut self, event: InputEvent) -> AppAction {
        match event {
            InputEvent::Key(key) => self.handle_key(&key),
            InputEvent::Mouse(mouse) => self.handle_mouse(&mouse),
            InputEvent::Resize(..) => AppAction::Redraw,
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> AppAction {
        if self.quit.matches(key) {
            return AppAction::Quit;
        }
        if self.focus_next.matches(key) {
            self.focus = self.focus.next();
            debug!(focus = ?self.focus, "focus changed");
            return AppAction::Redraw;
        }

        let event = InputEvent::Key(key.clone());
        let handled = match self.focus {
            Focus::Markdown => self.markdown.handle_event(&event),
            Focus::Code => self.code.handle_event(&event),
        };
        if handled {
            AppAction::Redraw
        } else {
            AppAction::None
        }
    }

    /// Wheel events go to the section under the pointer, or the focused one.
    fn handle_mouse(&mut self, mouse: &MouseEvent) -> AppAction {
        let pos = Position::new(mouse.x, mouse.y);
        let target = if self.markdown_area.contains(pos) {
            Focus::Markdown
        } else if self.code_area.contains(pos) {
            Focus::Code
        } else {
            self.focus
        };
        let event = InputEvent::Mouse(*mouse);
        let handled = match target {
            Focus::Markdown => self.markdown.handle_event(&event),
            Focus::Code => self.code.handle_event(&event),
        };
        if handled {
            AppAction::Redraw
        } else {
            AppAction::None
        }
    }

    /// Rows needed to show both sections and the help bar without scrolling.
    pub fn preferred_height(&mut self, width: u16) -> u16 {
        self.markdown
            .preferred_height(width, &self.theme)
            .saturating_add(self.code.preferred_height())
            .saturating_add(1)
    }

    pub fn render_ref(&mut self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        buf.set_style(area, Style::default());

        let markdown_h = self.markdown.preferred_height(area.width, &self.theme);
        let [markdown_area, code_area, help_area] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(markdown_h),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .areas(area);

        self.markdown_area = markdown_area;
        self.code_area = code_area;
        self.markdown.render_ref(
            markdown_area,
            buf,
            &self.theme,
            self.focus == Focus::Markdown,
        );
        self.code
            .render_ref(code_area, buf, &self.theme, self.focus == Focus::Code);
        self.help.render_ref(help_area, buf);
    }

    /// Mounts the whole tree headlessly at `width` columns and returns its rows as plain text.
    pub fn render_to_lines(&mut self, width: u16) -> Vec<String> {
        let height = self.preferred_height(width);
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        self.render_ref(area, &mut buf);
        (0..height).map(|y| buffer_row_text(&buf, y)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_showcase_core::input::MouseEventKind;
    use pretty_assertions::assert_eq;

    fn app() -> App {
        App::with_highlighter(&Config::default(), None)
    }

    #[test]
    fn tab_cycles_focus() {
        let mut app = app();
        assert_eq!(app.focus(), Focus::Markdown);
        let tab = InputEvent::Key(keymap::key(KeyCode::Tab));
        assert_eq!(app.handle_event(tab.clone()), AppAction::Redraw);
        assert_eq!(app.focus(), Focus::Code);
        assert_eq!(app.handle_event(tab), AppAction::Redraw);
        assert_eq!(app.focus(), Focus::Markdown);
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        for key in [
            keymap::key_char('q'),
            keymap::key(KeyCode::Esc),
            keymap::key_ctrl('c'),
        ] {
            assert_eq!(app.handle_event(InputEvent::Key(key)), AppAction::Quit);
        }
        assert_eq!(
            app.handle_event(InputEvent::Key(keymap::key_char('c'))),
            AppAction::None
        );
    }

    #[test]
    fn scroll_keys_go_to_focused_section() {
        let mut app = app();
        let area = Rect::new(0, 0, 60, 12);
        let mut buf = Buffer::empty(area);
        app.render_ref(area, &mut buf);

        app.handle_event(InputEvent::Key(keymap::key(KeyCode::Tab)));
        assert_eq!(
            app.handle_event(InputEvent::Key(keymap::key(KeyCode::Down))),
            AppAction::Redraw
        );
        assert_eq!(app.code().view().state.y, 1);
        assert_eq!(app.markdown().view().state.y, 0);
    }

    #[test]
    fn wheel_targets_section_under_pointer() {
        let mut app = app();
        let area = Rect::new(0, 0, 60, 12);
        let mut buf = Buffer::empty(area);
        app.render_ref(area, &mut buf);

        let action = app.handle_event(InputEvent::Mouse(MouseEvent {
            x: 5,
            y: 10,
            kind: MouseEventKind::ScrollDown,
        }));
        assert_eq!(action, AppAction::Redraw);
        assert_eq!(app.focus(), Focus::Markdown);
        assert!(app.code().view().state.y > 0);
    }

    #[test]
    fn resize_requests_redraw() {
        assert_eq!(app().handle_event(InputEvent::Resize(80, 24)), AppAction::Redraw);
    }

    #[test]
    fn preferred_height_fits_everything() {
        let mut app = app();
        assert_eq!(app.preferred_height(60), 6 + 12 + 1);
        let lines = app.render_to_lines(60);
        assert_eq!(lines.len(), 19);
        assert_eq!(lines[18], "q quit • tab focus • j/k scroll • g/G top/bottom");
    }
}
