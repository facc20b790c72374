use crate::input::KeyCode;
use crate::input::KeyEvent;
use crate::keymap;
use crate::viewport::ViewportState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

#[derive(Clone, Debug)]
pub struct ScrollBindings {
    pub line_step: i32,
    pub horiz_step: i32,
    pub wheel_step: i32,
    bindings: Vec<(ScrollAction, Vec<KeyEvent>)>,
}

impl Default for ScrollBindings {
    fn default() -> Self {
        Self {
            line_step: 1,
            horiz_step: 4,
            wheel_step: 3,
            bindings: vec![
                (
                    ScrollAction::Up,
                    vec![keymap::key(KeyCode::Up), keymap::key_char('k')],
                ),
                (
                    ScrollAction::Down,
                    vec![keymap::key(KeyCode::Down), keymap::key_char('j')],
                ),
                (
                    ScrollAction::Left,
                    vec![keymap::key(KeyCode::Left), keymap::key_char('h')],
                ),
                (
                    ScrollAction::Right,
                    vec![keymap::key(KeyCode::Right), keymap::key_char('l')],
                ),
                (
                    ScrollAction::PageUp,
                    vec![keymap::key(KeyCode::PageUp), keymap::key_ctrl('u')],
                ),
                (
                    ScrollAction::PageDown,
                    vec![keymap::key(KeyCode::PageDown), keymap::key_ctrl('d')],
                ),
                (
                    ScrollAction::Top,
                    vec![keymap::key(KeyCode::Home), keymap::key_char('g')],
                ),
                (
                    ScrollAction::Bottom,
                    vec![keymap::key(KeyCode::End), keymap::key_char('G')],
                ),
            ],
        }
    }
}

impl ScrollBindings {
    pub fn action_for(&self, key: &KeyEvent) -> Option<ScrollAction> {
        self.bindings
            .iter()
            .find(|(_, keys)| keys.iter().any(|p| keymap::key_event_matches(p, key)))
            .map(|(action, _)| *action)
    }

    pub fn apply(&self, state: &mut ViewportState, action: ScrollAction) {
        match action {
            ScrollAction::Up => state.scroll_y_by(-self.line_step),
            ScrollAction::Down => state.scroll_y_by(self.line_step),
            ScrollAction::Left => state.scroll_x_by(-self.horiz_step),
            ScrollAction::Right => state.scroll_x_by(self.horiz_step),
            ScrollAction::PageUp => state.page_up(),
            ScrollAction::PageDown => state.page_down(),
            ScrollAction::Top => state.to_top(),
            ScrollAction::Bottom => state.to_bottom(),
        }
    }
}
