use ratatui::style::Modifier;
use ratatui::style::Style;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    pub text_primary: Style,
    pub text_muted: Style,
    pub accent: Style,
    pub code_inline: Style,
    /// Style of level-1 headings. Deeper levels use [`Theme::heading`].
    pub title: Style,
    pub heading: Style,
    pub border: Style,
    pub border_focused: Style,
}

impl Theme {
    /// Returns the style for a heading of the given level (1-based).
    pub fn heading_style(&self, level: u8) -> Style {
        if level <= 1 {
            self.title
        } else {
            self.heading
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        use ratatui::style::Stylize;

        Self {
            text_primary: Style::default(),
            text_muted: Style::default().dark_gray(),
            accent: Style::default().cyan(),
            code_inline: Style::default().cyan(),
            title: Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            heading: Style::default().add_modifier(Modifier::BOLD),
            border: Style::default().dark_gray(),
            border_focused: Style::default().cyan(),
        }
    }
}
