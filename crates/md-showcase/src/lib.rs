//! `md-showcase` renders a fixed markdown document and a syntax-highlighted JSX snippet as two
//! bordered sections of a terminal UI.
//!
//! - [`app::App`] is the root container; mount it with [`app::App::render_ref`] or headlessly
//!   with [`app::App::render_to_lines`].
//! - [`sections`] holds the markdown and code leaves.
//! - [`config`], [`cli`] and [`logging`] are the binary's ambient layers.
pub mod app;
pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod sections;

pub use app::App;
pub use app::AppAction;
pub use config::Config;
pub use error::ShowcaseError;
