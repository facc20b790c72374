use md_showcase_core::code_render::CodeRenderOptions;
use md_showcase_core::code_render::CodeRenderStyles;
use md_showcase_core::code_render::render_code_lines;
use md_showcase_core::input::InputEvent;
use md_showcase_core::input::MouseEventKind;
use md_showcase_core::render;
use md_showcase_core::scroll::ScrollBindings;
use md_showcase_core::text::CodeHighlighter;
use md_showcase_core::text::spans_to_plain;
use md_showcase_core::theme::Theme;
use md_showcase_core::viewport::ViewportState;
use pulldown_cmark::CodeBlockKind;
use pulldown_cmark::CowStr;
use pulldown_cmark::Event;
use pulldown_cmark::HeadingLevel;
use pulldown_cmark::Options;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use pulldown_cmark::TagEnd;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;
use tracing::debug;
use tracing::trace;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;
use url::Url;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct InlineFlags {
    emphasis: bool,
    strong: bool,
    strike: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProseStyle {
    Normal,
    Heading(u8),
    BlockQuote,
    List,
}

#[derive(Clone, Debug)]
struct Segment {
    text: String,
    style: ProseStyle,
    flags: InlineFlags,
    inline_code: bool,
    link: bool,
    muted: bool,
}

impl Segment {
    fn new(text: impl Into<String>, style: ProseStyle, flags: InlineFlags) -> Self {
        Self {
            text: text.into(),
            style,
            flags,
            inline_code: false,
            link: false,
            muted: false,
        }
    }

    fn muted(text: impl Into<String>) -> Self {
        let mut seg = Self::new(text, ProseStyle::Normal, InlineFlags::default());
        seg.muted = true;
        seg
    }
}

#[derive(Clone, Debug)]
struct ProseBlock {
    lines: Vec<Vec<Segment>>,
    initial_prefix: Vec<Segment>,
    subsequent_prefix: Vec<Segment>,
}

#[derive(Clone, Debug)]
struct CodeBlock {
    language: Option<String>,
    lines: Arc<Vec<String>>,
    initial_prefix: Vec<Segment>,
    prefix: Vec<Segment>,
    highlight_key: u64,
}

#[derive(Clone, Debug)]
enum Block {
    Prose(ProseBlock),
    Code(CodeBlock),
    Rule(Vec<Segment>),
    Blank(Vec<Segment>),
}

#[derive(Clone, Debug)]
pub struct MarkdownViewOptions {
    pub wrap_prose: bool,
    pub show_scrollbar: bool,
    /// Render soft line breaks as new lines instead of spaces.
    pub preserve_new_lines: bool,
    /// Append ` (url)` after link text.
    pub show_link_destinations: bool,
    /// Keep the `#` markers in front of headings.
    pub show_heading_markers: bool,
    pub padding_left: u16,
    pub padding_right: u16,
    pub blockquote_prefix: String,
    pub code_block_indent: u16,
    pub show_code_line_numbers: bool,
    /// Base used to resolve relative link and image destinations.
    pub base_url: Option<String>,
    pub scroll: ScrollBindings,
}

impl Default for MarkdownViewOptions {
    fn default() -> Self {
        Self {
            wrap_prose: true,
            show_scrollbar: true,
            preserve_new_lines: false,
            show_link_destinations: false,
            show_heading_markers: false,
            padding_left: 0,
            padding_right: 0,
            blockquote_prefix: "| ".to_string(),
            code_block_indent: 4,
            show_code_line_numbers: false,
            base_url: None,
            scroll: ScrollBindings::default(),
        }
    }
}

/// A scrollable markdown viewer.
///
/// Markdown is parsed once in [`MarkdownView::set_markdown`]; layout is redone only when the
/// width or theme changes. Code blocks are highlighted once per highlighter and reused across
/// relayouts.
#[derive(Clone, Default)]
pub struct MarkdownView {
    blocks: Vec<Block>,
    rendered: Vec<RenderedLine>,
    layout_key: Option<(u16, Theme)>,
    pub state: ViewportState,
    options: MarkdownViewOptions,
    highlighter: Option<Arc<dyn CodeHighlighter + Send + Sync>>,
    code_cache: HashMap<u64, Arc<Vec<Line<'static>>>>,
}

#[derive(Clone, Debug)]
struct RenderedLine {
    spans: Vec<Span<'static>>,
    plain: String,
}

impl RenderedLine {
    fn new(spans: Vec<Span<'static>>) -> Self {
        let plain = spans_to_plain(&spans);
        Self { spans, plain }
    }
}

impl MarkdownView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MarkdownViewOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &MarkdownViewOptions {
        &self.options
    }

    /// Sets markdown source and reparses blocks.
    pub fn set_markdown(&mut self, input: &str) {
        self.blocks = parse_markdown_blocks(input, &self.options);
        debug!(
            bytes = input.len(),
            blocks = self.blocks.len(),
            "parsed markdown"
        );
        self.layout_key = None;
        self.rendered.clear();
    }

    /// Sets an optional highlighter used for code blocks.
    pub fn set_highlighter(&mut self, highlighter: Option<Arc<dyn CodeHighlighter + Send + Sync>>) {
        self.highlighter = highlighter;
        self.layout_key = None;
        self.code_cache.clear();
    }

    /// Updates viewport size for `area` (and accounts for optional scrollbar/padding).
    pub fn set_viewport(&mut self, area: Rect) {
        let (content_area, _) = self.split_area(area);
        let inner = self.inset(content_area);
        self.state.set_viewport(inner.width, inner.height);
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

    pub fn render_ref(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let (content_area, scrollbar_x) = self.split_area(area);
        let inner = self.inset(content_area);
        self.ensure_layout(inner.width, theme);
        self.set_viewport(area);

        for row in 0..content_area.height {
            let y = content_area.y + row;
            let idx = (self.state.y as usize).saturating_add(row as usize);
            buf.set_style(
                Rect::new(content_area.x, y, content_area.width, 1),
                theme.text_primary,
            );
            if let Some(line) = self.rendered.get(idx) {
                render::render_spans_clipped(
                    inner.x,
                    y,
                    self.state.x,
                    inner.width,
                    buf,
                    &line.spans,
                    theme.text_primary,
                );
            }
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

    /// Lays the document out for `width` columns (padding included) and returns styled lines.
    pub fn lines_for_width(&mut self, width: u16, theme: &Theme) -> Vec<Line<'static>> {
        self.ensure_layout(self.inner_width(width), theme);
        self.rendered
            .iter()
            .map(|l| Line::from(l.spans.clone()))
            .collect()
    }

    /// Like [`MarkdownView::lines_for_width`], without styles.
    pub fn plain_lines(&mut self, width: u16, theme: &Theme) -> Vec<String> {
        self.ensure_layout(self.inner_width(width), theme);
        self.rendered
            .iter()
            .map(|l| l.plain.trim_end().to_string())
            .collect()
    }

    /// Number of rows [`MarkdownView::render_ref`] needs to show the whole document in an area
    /// `width` columns wide (scrollbar and padding excluded from the text width).
    pub fn content_height(&mut self, width: u16, theme: &Theme) -> u16 {
        let (content_area, _) = self.split_area(Rect::new(0, 0, width, 1));
        self.ensure_layout(self.inset(content_area).width, theme);
        self.rendered.len().min(u16::MAX as usize) as u16
    }

    fn inner_width(&self, width: u16) -> u16 {
        width
            .saturating_sub(self.options.padding_left)
            .saturating_sub(self.options.padding_right)
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

    fn inset(&self, area: Rect) -> Rect {
        inset_h(area, self.options.padding_left, self.options.padding_right)
    }

    fn ensure_layout(&mut self, width: u16, theme: &Theme) {
        if let Some((w, t)) = self.layout_key.as_ref()
            && *w == width
            && t == theme
        {
            return;
        }
        if self
            .layout_key
            .as_ref()
            .is_some_and(|(_, t)| t != theme)
        {
            self.code_cache.clear();
        }

        let styles = CodeRenderStyles {
            base: theme.code_inline,
            gutter: theme.code_inline.patch(theme.text_muted),
        };
        let highlighter = self
            .highlighter
            .as_ref()
            .map(|h| h.as_ref() as &dyn CodeHighlighter);
        for block in &self.blocks {
            let Block::Code(code) = block else {
                continue;
            };
            if self.code_cache.contains_key(&code.highlight_key) {
                continue;
            }
            let rendered = render_code_lines(
                code.lines.as_slice(),
                code.language.as_deref(),
                highlighter,
                styles,
                CodeRenderOptions {
                    show_line_numbers: self.options.show_code_line_numbers,
                    indent: self.options.code_block_indent,
                    ..CodeRenderOptions::default()
                },
            );
            self.code_cache
                .insert(code.highlight_key, Arc::new(rendered.lines));
        }

        self.rendered = layout_blocks(
            &self.blocks,
            width,
            self.options.wrap_prose,
            theme,
            &self.code_cache,
        );
        let content_w = self
            .rendered
            .iter()
            .map(|l| UnicodeWidthStr::width(l.plain.as_str()) as u32)
            .max()
            .unwrap_or(0);
        self.state
            .set_content(content_w, self.rendered.len() as u32);
        self.layout_key = Some((width, theme.clone()));
        trace!(width, lines = self.rendered.len(), "laid out markdown");
    }
}

fn inset_h(area: Rect, left: u16, right: u16) -> Rect {
    let left = left.min(area.width);
    let right = right.min(area.width.saturating_sub(left));
    Rect::new(
        area.x + left,
        area.y,
        area.width.saturating_sub(left + right),
        area.height,
    )
}

#[derive(Clone, Debug)]
struct IndentCtx {
    initial: Vec<Segment>,
    subsequent: Vec<Segment>,
    initial_used: bool,
}

#[derive(Clone, Copy, Debug)]
struct ListCtx {
    ordered: bool,
    index: u64,
}

#[derive(Clone, Debug, Default)]
struct LinkCtx {
    dest: String,
    text: String,
}

struct Builder<'a> {
    opts: &'a MarkdownViewOptions,
    blocks: Vec<Block>,
    indent_stack: Vec<IndentCtx>,
    list_stack: Vec<ListCtx>,
    blockquote_depth: usize,
    wants_blank: bool,
    in_paragraph: bool,
    current_style: ProseStyle,
    inline: InlineFlags,
    para_lines: Vec<Vec<Segment>>,
    para_current: Vec<Segment>,
    para_prefix_initial: Vec<Segment>,
    para_prefix_subsequent: Vec<Segment>,
    in_code_block: bool,
    code_language: Option<String>,
    code_text: String,
    link: Option<LinkCtx>,
    image: Option<LinkCtx>,
}

impl<'a> Builder<'a> {
    fn new(opts: &'a MarkdownViewOptions) -> Self {
        Self {
            opts,
            blocks: Vec::new(),
            indent_stack: Vec::new(),
            list_stack: Vec::new(),
            blockquote_depth: 0,
            wants_blank: false,
            in_paragraph: false,
            current_style: ProseStyle::Normal,
            inline: InlineFlags::default(),
            para_lines: Vec::new(),
            para_current: Vec::new(),
            para_prefix_initial: Vec::new(),
            para_prefix_subsequent: Vec::new(),
            in_code_block: false,
            code_language: None,
            code_text: String::new(),
            link: None,
            image: None,
        }
    }

    fn resolve_dest(&self, dest: &str) -> String {
        resolve_url(self.opts.base_url.as_deref(), dest)
    }

    fn snapshot_prefixes(&self) -> (Vec<Segment>, Vec<Segment>) {
        let mut initial: Vec<Segment> = Vec::new();
        let mut subsequent: Vec<Segment> = Vec::new();
        for ctx in &self.indent_stack {
            if ctx.initial_used {
                initial.extend(ctx.subsequent.iter().cloned());
            } else {
                initial.extend(ctx.initial.iter().cloned());
            }
            subsequent.extend(ctx.subsequent.iter().cloned());
        }
        (initial, subsequent)
    }

    /// List markers are printed once, on the first line of the item's first block.
    fn mark_initial_used(&mut self) {
        for ctx in &mut self.indent_stack {
            ctx.initial_used = true;
        }
    }

    fn maybe_blank(&mut self) {
        if self.wants_blank && !matches!(self.blocks.last(), None | Some(Block::Blank(_))) {
            let (_, subsequent) = self.snapshot_prefixes();
            self.blocks.push(Block::Blank(subsequent));
        }
        self.wants_blank = false;
    }

    fn finish_block(&mut self) {
        self.mark_initial_used();
        self.wants_blank = self.list_stack.is_empty();
    }

    fn start_prose(&mut self, style: ProseStyle) {
        self.flush_para();
        self.maybe_blank();
        self.in_paragraph = true;
        self.current_style = match style {
            ProseStyle::Normal if self.blockquote_depth > 0 => ProseStyle::BlockQuote,
            other => other,
        };
        let (initial, subsequent) = self.snapshot_prefixes();
        self.para_prefix_initial = initial;
        self.para_prefix_subsequent = subsequent;
    }

    fn ensure_prose(&mut self) {
        if !self.in_paragraph {
            self.start_prose(ProseStyle::Normal);
        }
    }

    fn flush_para(&mut self) {
        if !self.in_paragraph {
            return;
        }
        self.in_paragraph = false;
        if !self.para_current.is_empty() {
            self.para_lines.push(std::mem::take(&mut self.para_current));
        }
        let lines = std::mem::take(&mut self.para_lines);
        if lines.is_empty() {
            return;
        }
        self.blocks.push(Block::Prose(ProseBlock {
            lines,
            initial_prefix: std::mem::take(&mut self.para_prefix_initial),
            subsequent_prefix: std::mem::take(&mut self.para_prefix_subsequent),
        }));
        self.finish_block();
    }

    fn start_code(&mut self, kind: CodeBlockKind<'_>) {
        self.flush_para();
        self.maybe_blank();
        self.in_code_block = true;
        self.code_text.clear();
        self.code_language = match kind {
            CodeBlockKind::Fenced(lang) => normalize_fenced_lang(&lang),
            CodeBlockKind::Indented => None,
        };
    }

    fn flush_code(&mut self) {
        if !self.in_code_block {
            return;
        }
        self.in_code_block = false;
        let text = std::mem::take(&mut self.code_text);
        let text = text.strip_suffix('\n').unwrap_or(&text);
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n').map(str::to_string).collect::<Vec<_>>()
        };
        let language = self.code_language.take();
        let highlight_key = highlight_cache_key(language.as_deref(), &lines);
        let (initial_prefix, prefix) = self.snapshot_prefixes();
        self.blocks.push(Block::Code(CodeBlock {
            language,
            lines: Arc::new(lines),
            initial_prefix,
            prefix,
            highlight_key,
        }));
        self.finish_block();
    }

    fn push_inline(&mut self, seg: Segment) {
        self.ensure_prose();
        self.para_current.push(seg);
    }

    fn push_text(&mut self, text: &str, inline_code: bool) {
        if let Some(link) = self.link.as_mut() {
            link.text.push_str(text);
        }
        let mut seg = Segment::new(text, self.current_style, self.inline);
        seg.inline_code = inline_code;
        seg.link = self.link.is_some();
        self.push_inline(seg);
    }

    fn line_break(&mut self) {
        if self.in_paragraph {
            self.para_lines.push(std::mem::take(&mut self.para_current));
        }
    }

    fn start_item(&mut self) {
        self.flush_para();
        let Some(list) = self.list_stack.last() else {
            return;
        };
        let marker = if list.ordered {
            format!("{}. ", list.index)
        } else {
            "• ".to_string()
        };
        let marker_width = UnicodeWidthStr::width(marker.as_str());
        self.indent_stack.push(IndentCtx {
            initial: vec![Segment::new(marker, ProseStyle::List, InlineFlags::default())],
            subsequent: vec![Segment::new(
                " ".repeat(marker_width),
                ProseStyle::List,
                InlineFlags::default(),
            )],
            initial_used: false,
        });
    }

    fn end_item(&mut self) {
        self.flush_para();
        self.flush_code();
        if self.indent_stack.last().is_some_and(|ctx| !ctx.initial_used) {
            // Empty item: still print its marker.
            let (initial, subsequent) = self.snapshot_prefixes();
            self.blocks.push(Block::Prose(ProseBlock {
                lines: vec![Vec::new()],
                initial_prefix: initial,
                subsequent_prefix: subsequent,
            }));
            self.finish_block();
        }
        if let Some(list) = self.list_stack.last_mut()
            && list.ordered
        {
            list.index += 1;
        }
        self.indent_stack.pop();
    }

    fn task_marker(&mut self, checked: bool) {
        let Some(ctx) = self.indent_stack.last_mut() else {
            return;
        };
        let marker = if checked { "[x] " } else { "[ ] " };
        let marker_width = UnicodeWidthStr::width(marker);
        if let Some(seg) = ctx.initial.first_mut() {
            seg.text = marker.to_string();
        }
        if let Some(seg) = ctx.subsequent.first_mut() {
            seg.text = " ".repeat(marker_width);
        }
        if self.in_paragraph && self.para_current.is_empty() && self.para_lines.is_empty() {
            let (initial, subsequent) = self.snapshot_prefixes();
            self.para_prefix_initial = initial;
            self.para_prefix_subsequent = subsequent;
        }
    }

    fn start_blockquote(&mut self) {
        self.flush_para();
        self.maybe_blank();
        self.blockquote_depth += 1;
        let mut seg = Segment::new(
            self.opts.blockquote_prefix.clone(),
            ProseStyle::BlockQuote,
            InlineFlags::default(),
        );
        seg.muted = true;
        self.indent_stack.push(IndentCtx {
            initial: vec![seg.clone()],
            subsequent: vec![seg],
            initial_used: false,
        });
    }

    fn end_blockquote(&mut self) {
        self.flush_para();
        self.flush_code();
        self.indent_stack.pop();
        self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
        self.wants_blank = self.list_stack.is_empty();
    }

    fn end_link(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        if !self.opts.show_link_destinations || link.dest.is_empty() {
            return;
        }
        let text = link.text.trim();
        let dest = link.dest.as_str();
        if text.is_empty() || text == dest || text == dest.strip_prefix("mailto:").unwrap_or(dest)
        {
            return;
        }
        self.push_inline(Segment::muted(format!(" ({dest})")));
    }

    fn end_image(&mut self) {
        let Some(image) = self.image.take() else {
            return;
        };
        let alt = normalize_whitespace(&image.text);
        let label = if alt.is_empty() {
            "[image]".to_string()
        } else {
            format!("[image: {alt}]")
        };
        self.push_inline(Segment::muted(label));
        if self.opts.show_link_destinations && !image.dest.is_empty() {
            self.push_inline(Segment::muted(format!(" ({})", image.dest)));
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_para();
        self.flush_code();
        self.blocks
    }
}

fn parse_markdown_blocks(input: &str, opts: &MarkdownViewOptions) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(input, options);

    let mut b = Builder::new(opts);
    for ev in parser {
        match ev {
            Event::Start(tag) => match tag {
                Tag::Paragraph => b.start_prose(ProseStyle::Normal),
                Tag::Heading { level, .. } => {
                    let level = heading_level(level);
                    b.start_prose(ProseStyle::Heading(level));
                    if b.opts.show_heading_markers {
                        let marker = format!("{} ", "#".repeat(level as usize));
                        b.para_current
                            .push(Segment::new(marker, ProseStyle::Heading(level), b.inline));
                    }
                }
                Tag::BlockQuote(_) => b.start_blockquote(),
                Tag::CodeBlock(kind) => b.start_code(kind),
                Tag::List(start) => {
                    b.flush_para();
                    if b.list_stack.is_empty() {
                        b.maybe_blank();
                    }
                    b.list_stack.push(ListCtx {
                        ordered: start.is_some(),
                        index: start.unwrap_or(1),
                    });
                }
                Tag::Item => b.start_item(),
                Tag::Emphasis => b.inline.emphasis = true,
                Tag::Strong => b.inline.strong = true,
                Tag::Strikethrough => b.inline.strike = true,
                Tag::Link { dest_url, .. } => {
                    b.link = Some(LinkCtx {
                        dest: b.resolve_dest(dest_url.as_ref()),
                        text: String::new(),
                    });
                }
                Tag::Image { dest_url, .. } => {
                    b.image = Some(LinkCtx {
                        dest: b.resolve_dest(dest_url.as_ref()),
                        text: String::new(),
                    });
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::HtmlBlock => b.flush_para(),
                TagEnd::BlockQuote(_) => b.end_blockquote(),
                TagEnd::CodeBlock => b.flush_code(),
                TagEnd::List(_) => {
                    b.flush_para();
                    b.list_stack.pop();
                    if b.list_stack.is_empty() {
                        b.wants_blank = true;
                    }
                }
                TagEnd::Item => b.end_item(),
                TagEnd::Emphasis => b.inline.emphasis = false,
                TagEnd::Strong => b.inline.strong = false,
                TagEnd::Strikethrough => b.inline.strike = false,
                TagEnd::Link => b.end_link(),
                TagEnd::Image => b.end_image(),
                _ => {}
            },
            Event::Text(text) => {
                if b.in_code_block {
                    for ch in text.chars() {
                        match ch {
                            '\r' => {}
                            '\t' => b.code_text.push_str("    "),
                            other => b.code_text.push(other),
                        }
                    }
                } else if let Some(image) = b.image.as_mut() {
                    image.text.push_str(&text);
                } else {
                    b.push_text(&text, false);
                }
            }
            Event::Code(code) => {
                if let Some(image) = b.image.as_mut() {
                    image.text.push_str(&code);
                } else {
                    b.push_text(&code, true);
                }
            }
            Event::SoftBreak => {
                if b.image.is_some() {
                    continue;
                }
                if b.opts.preserve_new_lines {
                    b.line_break();
                } else if b.in_paragraph {
                    b.push_text(" ", false);
                }
            }
            Event::HardBreak => b.line_break(),
            Event::Rule => {
                b.flush_para();
                b.maybe_blank();
                let (_, subsequent) = b.snapshot_prefixes();
                b.blocks.push(Block::Rule(subsequent));
                b.finish_block();
            }
            Event::Html(html) => {
                // Block HTML arrives one source line per event.
                let text = html_to_text(&html);
                if text.is_empty() {
                    continue;
                }
                if b.in_paragraph && !b.para_current.is_empty() {
                    if b.opts.preserve_new_lines {
                        b.line_break();
                    } else {
                        b.push_text(" ", false);
                    }
                }
                b.push_text(&text, false);
            }
            Event::InlineHtml(html) => {
                let text = html_to_text(&html);
                if !text.is_empty() {
                    b.push_text(&text, false);
                }
            }
            Event::TaskListMarker(checked) => b.task_marker(checked),
            _ => {}
        }
    }
    b.finish()
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn normalize_fenced_lang(lang: &CowStr<'_>) -> Option<String> {
    let first = lang.split_whitespace().next().unwrap_or("");
    let first = first.split(',').next().unwrap_or("").trim();
    let first = first.strip_prefix("language-").unwrap_or(first);
    let first = first.trim_start_matches('{').trim_end_matches('}').trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

fn html_to_text(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if in_tag => {}
            _ => out.push(ch),
        }
    }
    normalize_whitespace(&decode_basic_html_entities(&out))
}

fn decode_basic_html_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_url(base_url: Option<&str>, dest: &str) -> String {
    let dest = dest.trim();
    if dest.is_empty() || is_absolute_url(dest) {
        return dest.to_string();
    }
    let Some(base) = base_url.map(str::trim).filter(|s| !s.is_empty()) else {
        return dest.to_string();
    };

    match Url::parse(base) {
        Ok(base) => base
            .join(dest)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| dest.to_string()),
        // Plain directory paths are joined textually.
        Err(_) => {
            let dest = dest.trim_start_matches("./").trim_start_matches('/');
            format!("{}/{dest}", base.trim_end_matches(['/', '\\']))
        }
    }
}

fn is_absolute_url(dest: &str) -> bool {
    dest.starts_with('#')
        || dest.starts_with('/')
        || dest.starts_with("mailto:")
        || dest.starts_with("http://")
        || dest.starts_with("https://")
        || dest.starts_with("file://")
}

fn highlight_cache_key(language: Option<&str>, lines: &[String]) -> u64 {
    let mut h = DefaultHasher::new();
    language.unwrap_or("").hash(&mut h);
    lines.hash(&mut h);
    h.finish()
}

fn layout_blocks(
    blocks: &[Block],
    width: u16,
    wrap_prose: bool,
    theme: &Theme,
    code_cache: &HashMap<u64, Arc<Vec<Line<'static>>>>,
) -> Vec<RenderedLine> {
    let mut out: Vec<RenderedLine> = Vec::new();
    for block in blocks {
        match block {
            Block::Blank(prefix) => {
                out.push(RenderedLine::new(segments_to_spans(prefix, theme)));
            }
            Block::Rule(prefix) => {
                let mut spans = segments_to_spans(prefix, theme);
                let prefix_cols = UnicodeWidthStr::width(join_segments_plain(prefix).as_str());
                let rule_len = (width as usize).saturating_sub(prefix_cols).max(1);
                spans.push(Span::styled("─".repeat(rule_len), theme.text_muted));
                out.push(RenderedLine::new(spans));
            }
            Block::Code(code) => {
                let Some(lines) = code_cache.get(&code.highlight_key) else {
                    continue;
                };
                for (i, line) in lines.iter().enumerate() {
                    let prefix = if i == 0 {
                        &code.initial_prefix
                    } else {
                        &code.prefix
                    };
                    let mut spans = segments_to_spans(prefix, theme);
                    spans.extend(line.spans.iter().cloned());
                    out.push(RenderedLine::new(spans));
                }
            }
            Block::Prose(p) => {
                for (i, logical) in p.lines.iter().enumerate() {
                    let initial_prefix = if i == 0 {
                        &p.initial_prefix
                    } else {
                        &p.subsequent_prefix
                    };
                    if wrap_prose {
                        out.extend(wrap_segments(
                            initial_prefix,
                            &p.subsequent_prefix,
                            logical,
                            width,
                            theme,
                        ));
                    } else {
                        let mut spans = segments_to_spans(initial_prefix, theme);
                        spans.extend(segments_to_spans(logical, theme));
                        out.push(RenderedLine::new(spans));
                    }
                }
            }
        }
    }
    out
}

/// One output row being filled by [`wrap_segments`].
struct RowBuilder {
    prefix: Vec<Segment>,
    segs: Vec<Segment>,
    cols: usize,
}

impl RowBuilder {
    fn new(prefix: &[Segment]) -> Self {
        Self {
            cols: UnicodeWidthStr::width(join_segments_plain(prefix).as_str()),
            prefix: prefix.to_vec(),
            segs: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    fn push(&mut self, seg: Segment) {
        self.cols += UnicodeWidthStr::width(seg.text.as_str());
        self.segs.push(seg);
    }

    fn finish(mut self, theme: &Theme) -> RenderedLine {
        while self.segs.last().is_some_and(|s| is_all_ws(&s.text)) {
            self.segs.pop();
        }
        let mut spans = segments_to_spans(&self.prefix, theme);
        spans.extend(segments_to_spans(&self.segs, theme));
        RenderedLine::new(spans)
    }
}

fn wrap_segments(
    initial_prefix: &[Segment],
    subsequent_prefix: &[Segment],
    segments: &[Segment],
    width: u16,
    theme: &Theme,
) -> Vec<RenderedLine> {
    if width == 0 {
        return Vec::new();
    }
    let width = width as usize;

    let mut out: Vec<RenderedLine> = Vec::new();
    let mut row = RowBuilder::new(initial_prefix);

    for tok in segments.iter().flat_map(split_segment_ws) {
        let tok_cols = UnicodeWidthStr::width(tok.text.as_str());

        if is_all_ws(&tok.text) {
            if row.is_empty() {
                continue;
            }
            if row.cols + tok_cols <= width {
                row.push(tok);
            } else {
                out.push(std::mem::replace(&mut row, RowBuilder::new(subsequent_prefix)).finish(theme));
            }
            continue;
        }

        if !row.is_empty() && row.cols + tok_cols > width {
            out.push(std::mem::replace(&mut row, RowBuilder::new(subsequent_prefix)).finish(theme));
        }

        let mut remaining = tok;
        loop {
            let cols = UnicodeWidthStr::width(remaining.text.as_str());
            if row.cols + cols <= width {
                row.push(remaining);
                break;
            }
            let max = width.saturating_sub(row.cols).max(1);
            let (head, tail) = split_to_width(&remaining, max);
            row.push(head);
            out.push(std::mem::replace(&mut row, RowBuilder::new(subsequent_prefix)).finish(theme));
            if tail.text.is_empty() {
                break;
            }
            remaining = tail;
        }
    }

    if !row.is_empty() || out.is_empty() {
        out.push(row.finish(theme));
    }
    out
}

fn split_segment_ws(seg: &Segment) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    let mut buf = String::new();
    let mut last_was_ws: Option<bool> = None;
    for ch in seg.text.chars() {
        let is_ws = ch.is_whitespace();
        if last_was_ws.is_some_and(|prev| prev != is_ws) {
            let mut s = seg.clone();
            s.text = std::mem::take(&mut buf);
            out.push(s);
        }
        buf.push(ch);
        last_was_ws = Some(is_ws);
    }
    if !buf.is_empty() {
        let mut s = seg.clone();
        s.text = buf;
        out.push(s);
    }
    out
}

/// Splits off at most `max_cols` columns, always taking at least one character.
fn split_to_width(seg: &Segment, max_cols: usize) -> (Segment, Segment) {
    let mut cols = 0usize;
    let mut idx = 0usize;
    for (byte_idx, ch) in seg.text.char_indices() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if cols + w > max_cols && idx > 0 {
            break;
        }
        cols += w;
        idx = byte_idx + ch.len_utf8();
    }
    let (a, b) = seg.text.split_at(idx);
    let mut left = seg.clone();
    left.text = a.to_string();
    let mut right = seg.clone();
    right.text = b.to_string();
    (left, right)
}

fn is_all_ws(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

fn segments_to_spans(segs: &[Segment], theme: &Theme) -> Vec<Span<'static>> {
    segs.iter()
        .filter(|s| !s.text.is_empty())
        .map(|s| Span::styled(s.text.clone(), style_for_segment(theme, s)))
        .collect()
}

fn style_for_segment(theme: &Theme, seg: &Segment) -> Style {
    let mut style = if seg.muted {
        theme.text_muted
    } else {
        match seg.style {
            ProseStyle::Normal => theme.text_primary,
            ProseStyle::Heading(level) => theme.heading_style(level),
            ProseStyle::BlockQuote => theme.text_muted,
            ProseStyle::List => theme.accent,
        }
    };

    if seg.inline_code {
        style = style.patch(theme.code_inline);
    }
    if seg.link {
        style = style.patch(theme.accent).add_modifier(Modifier::UNDERLINED);
    }
    if seg.flags.emphasis {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if seg.flags.strong {
        style = style.add_modifier(Modifier::BOLD);
    }
    if seg.flags.strike {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }

    style
}

fn join_segments_plain(segs: &[Segment]) -> String {
    segs.iter().map(|s| s.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_showcase_core::keymap;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    fn plain(md: &str, width: u16) -> Vec<String> {
        plain_with(md, width, MarkdownViewOptions::default())
    }

    fn plain_with(md: &str, width: u16, options: MarkdownViewOptions) -> Vec<String> {
        let mut view = MarkdownView::with_options(options);
        view.set_markdown(md);
        view.plain_lines(width, &Theme::default())
    }

    #[test]
    fn parses_code_block_language_and_lines() {
        let blocks = parse_markdown_blocks(
            "```rs\nfn main() {}\n```\n",
            &MarkdownViewOptions::default(),
        );
        let code = blocks
            .iter()
            .find_map(|b| match b {
                Block::Code(c) => Some(c),
                _ => None,
            })
            .expect("code block");
        assert_eq!(code.language.as_deref(), Some("rs"));
        assert_eq!(code.lines.as_slice(), &["fn main() {}".to_string()]);
    }

    #[test]
    fn normalizes_fence_info_strings() {
        assert_eq!(
            normalize_fenced_lang(&CowStr::from("language-js title=x")),
            Some("js".to_string())
        );
        assert_eq!(
            normalize_fenced_lang(&CowStr::from("{rust,ignore}")),
            Some("rust".to_string())
        );
        assert_eq!(normalize_fenced_lang(&CowStr::from("  ")), None);
    }

    #[test]
    fn indented_heading_renders_without_marker() {
        let md = "\n  # Titre principal\n\n  Voici un exemple de code JSX :\n  ";
        assert_eq!(
            plain(md, 80),
            vec!["Titre principal", "", "Voici un exemple de code JSX :"]
        );
    }

    #[test]
    fn heading_markers_are_optional() {
        let lines = plain_with(
            "## Sub",
            80,
            MarkdownViewOptions {
                show_heading_markers: true,
                ..MarkdownViewOptions::default()
            },
        );
        assert_eq!(lines, vec!["## Sub"]);
    }

    #[test]
    fn headings_use_theme_heading_styles() {
        let theme = Theme::default();
        let mut view = MarkdownView::new();
        view.set_markdown("# Top\n\n## Second");
        let lines = view.lines_for_width(40, &theme);
        assert_eq!(lines[0].spans[0].style, theme.title);
        assert_eq!(lines[2].spans[0].style, theme.heading);
    }

    #[test]
    fn wraps_prose_but_not_code() {
        let md = "hello world\n\n```txt\nabcdef\n```\n";
        assert_eq!(plain(md, 5), vec!["hello", "world", "", "    abcdef"]);
    }

    #[test]
    fn splits_words_longer_than_width() {
        assert_eq!(plain("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(plain("你好世界", 3), vec!["你", "好", "世", "界"]);
    }

    #[test]
    fn inline_styles_map_to_modifiers() {
        let theme = Theme::default();
        let mut view = MarkdownView::new();
        view.set_markdown("**bold** *it* ~~gone~~ `code`");
        let line = view.lines_for_width(80, &theme).remove(0);
        let style_of = |text: &str| {
            line.spans
                .iter()
                .find(|s| s.content == text)
                .map(|s| s.style)
                .expect("span")
        };
        assert!(style_of("bold").add_modifier.contains(Modifier::BOLD));
        assert!(style_of("it").add_modifier.contains(Modifier::ITALIC));
        assert!(style_of("gone").add_modifier.contains(Modifier::CROSSED_OUT));
        assert_eq!(style_of("code").fg, theme.code_inline.fg);
    }

    #[test]
    fn renders_lists_with_markers() {
        let md = "- a\n- b\n\n1. x\n2. y\n";
        assert_eq!(plain(md, 20), vec!["• a", "• b", "", "1. x", "2. y"]);
    }

    #[test]
    fn nested_lists_indent_under_parent() {
        assert_eq!(plain("- a\n  - b\n", 20), vec!["• a", "  • b"]);
    }

    #[test]
    fn ordered_lists_respect_start_number() {
        assert_eq!(plain("3. c\n4. d\n", 20), vec!["3. c", "4. d"]);
    }

    #[test]
    fn task_lists_replace_bullets() {
        assert_eq!(
            plain("- [x] done\n- [ ] todo\n", 20),
            vec!["[x] done", "[ ] todo"]
        );
    }

    #[test]
    fn wrapped_list_items_hang_under_marker() {
        assert_eq!(plain("- aaa bbb\n", 6), vec!["• aaa", "  bbb"]);
    }

    #[test]
    fn blockquotes_get_prefix() {
        assert_eq!(plain("> quoted text\n", 40), vec!["| quoted text"]);
    }

    #[test]
    fn rules_span_the_width() {
        assert_eq!(plain("a\n\n---\n\nb", 4), vec!["a", "", "────", "", "b"]);
    }

    #[test]
    fn soft_breaks_join_unless_preserved() {
        assert_eq!(plain("a\nb", 20), vec!["a b"]);
        let lines = plain_with(
            "a\nb",
            20,
            MarkdownViewOptions {
                preserve_new_lines: true,
                ..MarkdownViewOptions::default()
            },
        );
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn hard_breaks_start_new_line() {
        assert_eq!(plain("a  \nb", 20), vec!["a", "b"]);
    }

    #[test]
    fn link_destinations_are_optional_and_resolved() {
        assert_eq!(plain("[site](https://example.com)", 80), vec!["site"]);

        let options = MarkdownViewOptions {
            show_link_destinations: true,
            base_url: Some("https://example.com/docs/".to_string()),
            ..MarkdownViewOptions::default()
        };
        assert_eq!(
            plain_with("[guide](guide.md)", 80, options.clone()),
            vec!["guide (https://example.com/docs/guide.md)"]
        );
        assert_eq!(
            plain_with("<https://example.com>", 80, options),
            vec!["https://example.com"]
        );
    }

    #[test]
    fn resolves_against_plain_directory_base() {
        assert_eq!(resolve_url(Some("/tmp/docs/"), "./a.md"), "/tmp/docs/a.md");
        assert_eq!(resolve_url(None, "a.md"), "a.md");
        assert_eq!(resolve_url(Some("https://x.dev/"), "#top"), "#top");
    }

    #[test]
    fn images_render_alt_text() {
        assert_eq!(plain("![logo](img.png)", 80), vec!["[image: logo]"]);
        assert_eq!(plain("![](img.png)", 80), vec!["[image]"]);
    }

    #[test]
    fn inline_html_is_reduced_to_text() {
        assert_eq!(plain("x <b>hi</b> y", 80), vec!["x hi y"]);
        assert_eq!(html_to_text("<p>a &amp; b</p>"), "a & b");
    }

    #[test]
    fn block_html_lines_stay_separate_words() {
        let md = "<div>\none\n</div>\n<div>\ntwo\n</div>\n\n<p>alpha</p>\n<p>beta</p>\n";
        assert_eq!(plain(md, 80), vec!["one two", "", "alpha beta"]);

        let lines = plain_with(
            md,
            80,
            MarkdownViewOptions {
                preserve_new_lines: true,
                ..MarkdownViewOptions::default()
            },
        );
        assert_eq!(lines, vec!["one", "two", "", "alpha", "beta"]);
    }

    #[test]
    fn can_show_line_numbers_for_code_blocks() {
        let lines = plain_with(
            "```rs\nfn main() {}\n```\n",
            80,
            MarkdownViewOptions {
                show_code_line_numbers: true,
                ..MarkdownViewOptions::default()
            },
        );
        assert_eq!(lines, vec!["1 │     fn main() {}"]);
    }

    #[test]
    fn code_blocks_are_highlighted_once_across_relayouts() {
        #[derive(Default)]
        struct Counting(AtomicUsize);
        impl CodeHighlighter for Counting {
            fn highlight_lines(
                &self,
                _language: Option<&str>,
                lines: &[&str],
            ) -> Vec<Vec<Span<'static>>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                lines.iter().map(|l| vec![Span::raw(l.to_string())]).collect()
            }
        }

        let hi = Arc::new(Counting::default());
        let shared: Arc<dyn CodeHighlighter + Send + Sync> = hi.clone();
        let mut view = MarkdownView::new();
        view.set_highlighter(Some(shared));
        view.set_markdown("```js\nlet a = 1;\n```\n");
        let theme = Theme::default();
        view.lines_for_width(40, &theme);
        view.lines_for_width(20, &theme);
        view.lines_for_width(40, &theme);
        assert_eq!(hi.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn render_ref_handles_tiny_areas() {
        let mut view = MarkdownView::new();
        view.set_markdown("# Title\n\nSome text that wraps around.\n\n```\ncode\n```\n");
        let theme = Theme::default();
        for (w, h) in [(0, 0), (1, 1), (2, 1), (3, 5), (80, 2)] {
            let mut buf = Buffer::empty(Rect::new(0, 0, w, h));
            view.render_ref(Rect::new(0, 0, w, h), &mut buf, &theme);
        }
    }

    #[test]
    fn render_ref_applies_padding_and_scroll() {
        let mut view = MarkdownView::with_options(MarkdownViewOptions {
            padding_left: 2,
            show_scrollbar: false,
            ..MarkdownViewOptions::default()
        });
        view.set_markdown("one\n\ntwo\n\nthree");
        let theme = Theme::default();
        let area = Rect::new(0, 0, 10, 2);
        let mut buf = Buffer::empty(area);
        view.render_ref(area, &mut buf, &theme);
        assert_eq!(render::buffer_row_text(&buf, 0), "  one");

        assert!(view.handle_event(&InputEvent::Key(keymap::key_char('G'))));
        let mut buf = Buffer::empty(area);
        view.render_ref(area, &mut buf, &theme);
        assert_eq!(render::buffer_row_text(&buf, 0), "");
        assert_eq!(render::buffer_row_text(&buf, 1), "  three");
    }

    #[test]
    fn content_height_counts_wrapped_rows() {
        let mut view = MarkdownView::new();
        view.set_markdown("aa bb cc");
        let theme = Theme::default();
        assert_eq!(view.content_height(80, &theme), 1);
        // One column goes to the scrollbar.
        assert_eq!(view.content_height(3, &theme), 3);
    }
}
