//! Syntax highlighting backends for `md-showcase`.
//!
//! Backends implement [`md_showcase_core::text::CodeHighlighter`]. The only backend today is
//! `syntect` (feature: `syntect`, on by default), which ships its own grammars and themes.
#[cfg(feature = "syntect")]
pub mod syntect;

pub mod error;

pub use error::SyntaxError;
