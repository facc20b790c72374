#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewportState {
    pub x: u32,
    pub y: u32,
    pub viewport_w: u16,
    pub viewport_h: u16,
    pub content_w: u32,
    pub content_h: u32,
}

impl ViewportState {
    pub fn set_viewport(&mut self, w: u16, h: u16) {
        self.viewport_w = w;
        self.viewport_h = h;
        self.clamp();
    }

    pub fn set_content(&mut self, w: u32, h: u32) {
        self.content_w = w;
        self.content_h = h;
        self.clamp();
    }

    pub fn clamp(&mut self) {
        self.y = self.y.min(self.max_y());
        self.x = self.x.min(self.max_x());
    }

    pub fn scroll_y_by(&mut self, delta: i32) {
        let next = self.y as i64 + delta as i64;
        self.y = next.clamp(0, self.max_y() as i64) as u32;
    }

    pub fn scroll_x_by(&mut self, delta: i32) {
        let next = self.x as i64 + delta as i64;
        self.x = next.clamp(0, self.max_x() as i64) as u32;
    }

    pub fn page_down(&mut self) {
        self.scroll_y_by(self.viewport_h.saturating_sub(1) as i32);
    }

    pub fn page_up(&mut self) {
        self.scroll_y_by(-(self.viewport_h.saturating_sub(1) as i32));
    }

    pub fn to_top(&mut self) {
        self.y = 0;
    }

    pub fn to_bottom(&mut self) {
        self.y = self.max_y();
    }

    fn max_y(&self) -> u32 {
        self.content_h.saturating_sub(self.viewport_h as u32)
    }

    fn max_x(&self) -> u32 {
        self.content_w.saturating_sub(self.viewport_w as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_clamps_both_axes() {
        let mut s = ViewportState::default();
        s.set_viewport(10, 5);
        s.set_content(12, 6);
        s.x = 99;
        s.y = 99;
        s.clamp();
        assert_eq!(s.x, 2);
        assert_eq!(s.y, 1);
    }

    #[test]
    fn scrolling_never_leaves_content() {
        let mut s = ViewportState::default();
        s.set_viewport(10, 4);
        s.set_content(10, 20);
        s.scroll_y_by(-5);
        assert_eq!(s.y, 0);
        s.page_down();
        assert_eq!(s.y, 3);
        s.to_bottom();
        assert_eq!(s.y, 16);
        s.scroll_y_by(100);
        assert_eq!(s.y, 16);
    }

    #[test]
    fn shrinking_content_pulls_offset_back() {
        let mut s = ViewportState::default();
        s.set_viewport(10, 4);
        s.set_content(10, 20);
        s.to_bottom();
        s.set_content(10, 2);
        assert_eq!(s.y, 0);
    }
}
