//! Markdown rendering for `md-showcase`.
//!
//! [`view::MarkdownView`] parses markdown with `pulldown-cmark` once, lays it out for a given
//! width (word wrapping, list and quote prefixes, highlighted code blocks) and renders the result
//! into a scrollable viewport.
pub mod view;

pub use view::MarkdownView;
pub use view::MarkdownViewOptions;
