use md_showcase_core::render::buffer_row_text;
use md_showcase_core::theme::Theme;
use md_showcase_markdown::MarkdownView;
use md_showcase_markdown::MarkdownViewOptions;
use md_showcase_syntax::syntect::SyntectHighlighter;
use pretty_assertions::assert_eq;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use std::sync::Arc;

const DOC: &str = "\
# Guide

Intro paragraph with **bold** text and a [link](usage.md).

- first
- [x] done
  1. nested

> quoted

```jsx
function App() {
  return null;
}
```

---

The end.
";

fn plain(view: &mut MarkdownView, width: u16) -> Vec<String> {
    view.plain_lines(width, &Theme::default())
}

#[test]
fn renders_a_mixed_document() {
    let mut view = MarkdownView::with_options(MarkdownViewOptions {
        show_link_destinations: true,
        base_url: Some("https://example.com/docs/".to_string()),
        ..MarkdownViewOptions::default()
    });
    view.set_markdown(DOC);
    let rule = "─".repeat(60);
    let expected = vec![
        "Guide",
        "",
        "Intro paragraph with bold text and a link",
        "(https://example.com/docs/usage.md).",
        "",
        "• first",
        "[x] done",
        "    1. nested",
        "",
        "| quoted",
        "",
        "    function App() {",
        "      return null;",
        "    }",
        "",
        rule.as_str(),
        "",
        "The end.",
    ];
    assert_eq!(plain(&mut view, 60), expected);
}

#[test]
fn highlighted_code_keeps_its_text() {
    let mut view = MarkdownView::new();
    view.set_highlighter(Some(Arc::new(SyntectHighlighter::new())));
    view.set_markdown("```javascript\nfunction App() {}\n```\n");
    let theme = Theme::default();
    let lines = view.lines_for_width(40, &theme);
    assert_eq!(lines.len(), 1);
    let text: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
    assert_eq!(text, "    function App() {}");
    assert!(lines[0].spans.len() > 2);
}

#[test]
fn renders_into_buffer_with_scrollbar() {
    let mut view = MarkdownView::new();
    let body = (1..=20)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    view.set_markdown(&body);
    let area = Rect::new(0, 0, 20, 4);
    let mut buf = Buffer::empty(area);
    view.render_ref(area, &mut buf, &Theme::default());
    assert!(buffer_row_text(&buf, 0).starts_with("line 1"));
    assert!(buffer_row_text(&buf, 2).starts_with("line 2"));
    assert_eq!(view.state.content_h, 39);
    assert_eq!(view.state.viewport_h, 4);
    assert_eq!(view.state.viewport_w, 19);
}
