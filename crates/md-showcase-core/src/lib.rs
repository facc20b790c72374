//! `md-showcase-core` holds the small, reusable pieces the showcase widgets are built from.
//!
//! Markdown parsing and syntax highlighting backends live in their own crates
//! (`md-showcase-markdown`, `md-showcase-syntax`); this crate only knows about styled spans,
//! buffers and scroll state.
//!
//! Useful entry points:
//! - [`code_view::CodeView`]: scrollable code viewer with an optional highlighter.
//! - [`code_render::render_code_lines`]: render core for code blocks embedded in other layouts.
//! - [`text::CodeHighlighter`]: the seam highlighting backends plug into.
//! - [`help::HelpBar`]: one-line key binding summary.
pub mod theme;

pub mod text;

#[cfg(feature = "crossterm")]
pub mod crossterm_input;

pub mod render;
pub mod scroll;
pub mod viewport;

pub mod code_render;

pub mod code_view;
pub mod help;
pub mod input;
pub mod keymap;
