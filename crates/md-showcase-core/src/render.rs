use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Span;
use unicode_width::UnicodeWidthChar;

use crate::viewport::ViewportState;

pub const TAB_WIDTH: usize = 4;

pub fn render_scrollbar(area: Rect, buf: &mut Buffer, state: &ViewportState, style: Style) {
    buf.set_style(area, style);
    if area.height == 0 {
        return;
    }
    if state.content_h <= state.viewport_h as u32 || state.content_h == 0 {
        for dy in 0..area.height {
            buf.set_stringn(area.x, area.y + dy, " ", 1, style);
        }
        return;
    }

    let track_h = area.height as f64;
    let thumb_h = ((state.viewport_h as f64 / state.content_h as f64) * track_h)
        .round()
        .clamp(1.0, track_h) as u16;

    let max_y = state
        .content_h
        .saturating_sub(state.viewport_h as u32)
        .max(1) as f64;
    let thumb_top = ((state.y as f64 / max_y) * (track_h - thumb_h as f64))
        .round()
        .clamp(0.0, (track_h - thumb_h as f64).max(0.0)) as u16;

    for dy in 0..area.height {
        let ch = if dy >= thumb_top && dy < thumb_top + thumb_h {
            "█"
        } else {
            " "
        };
        buf.set_stringn(area.x, area.y + dy, ch, 1, style);
    }
}

/// Writes cells left to right, skipping the first `start_col` columns and stopping at `max_cols`.
struct ClippedWriter<'a> {
    buf: &'a mut Buffer,
    x: u16,
    y: u16,
    start_col: usize,
    max_cols: usize,
    col: usize,
    out_cols: usize,
}

impl ClippedWriter<'_> {
    /// Returns `false` once the row is full.
    fn push(&mut self, ch: char, style: Style) -> bool {
        if ch == '\t' {
            for _ in 0..TAB_WIDTH {
                if !self.push(' ', style) {
                    return false;
                }
            }
            return true;
        }

        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w == 0 {
            return true;
        }
        // Columns left of the viewport, including wide chars cut by its left edge.
        if self.col < self.start_col {
            self.col += w;
            return true;
        }
        if self.out_cols + w > self.max_cols {
            return false;
        }

        let mut tmp = [0u8; 4];
        let dx = self.out_cols as u16;
        if let Some(cell) = self.buf.cell_mut((self.x + dx, self.y)) {
            cell.set_style(style);
            cell.set_symbol(ch.encode_utf8(&mut tmp));
        }
        if w == 2
            && let Some(cell) = self.buf.cell_mut((self.x + dx + 1, self.y))
        {
            cell.set_style(style);
            cell.set_symbol("");
        }
        self.out_cols += w;
        self.col += w;
        true
    }
}

pub fn render_str_clipped(
    x: u16,
    y: u16,
    start_col: u32,
    max_cols: u16,
    buf: &mut Buffer,
    input: &str,
    style: Style,
) {
    if max_cols == 0 {
        return;
    }
    let mut w = ClippedWriter {
        buf,
        x,
        y,
        start_col: start_col as usize,
        max_cols: max_cols as usize,
        col: 0,
        out_cols: 0,
    };
    for ch in input.chars() {
        if !w.push(ch, style) {
            return;
        }
    }
}

/// Renders styled spans on one row. Spans with the default style fall back to `fallback_style`.
pub fn render_spans_clipped(
    x: u16,
    y: u16,
    start_col: u32,
    max_cols: u16,
    buf: &mut Buffer,
    spans: &[Span<'_>],
    fallback_style: Style,
) {
    if max_cols == 0 {
        return;
    }
    let mut w = ClippedWriter {
        buf,
        x,
        y,
        start_col: start_col as usize,
        max_cols: max_cols as usize,
        col: 0,
        out_cols: 0,
    };
    for span in spans {
        let style = if span.style == Style::default() {
            fallback_style
        } else {
            fallback_style.patch(span.style)
        };
        for ch in span.content.chars() {
            if !w.push(ch, style) {
                return;
            }
        }
    }
}

/// Reads one buffer row back as text, with trailing blanks removed.
pub fn buffer_row_text(buf: &Buffer, y: u16) -> String {
    let area = buf.area;
    let mut out = String::new();
    for x in area.x..area.x + area.width {
        if let Some(cell) = buf.cell((x, y)) {
            out.push_str(cell.symbol());
        }
    }
    out.trim_end().to_string()
}
