use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "md-showcase",
    version,
    about = "Render a markdown document and a highlighted JSX snippet in the terminal"
)]
pub struct Cli {
    /// Print the rendered showcase as plain text and exit.
    #[arg(long)]
    pub dump: bool,

    /// Width used by --dump.
    #[arg(long, value_name = "COLUMNS", default_value_t = 80)]
    pub width: u16,

    /// TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Highlighting theme name or alias (e.g. docco, github, base16-ocean.dark).
    #[arg(long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Show line numbers in the code section.
    #[arg(long, overrides_with = "no_line_numbers")]
    pub line_numbers: bool,

    /// Hide line numbers in the code section.
    #[arg(long, overrides_with = "line_numbers")]
    pub no_line_numbers: bool,

    /// Write logs to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(theme) = &self.theme {
            config.code.theme = theme.clone();
        }
        if self.line_numbers {
            config.code.show_line_numbers = true;
        }
        if self.no_line_numbers {
            config.code.show_line_numbers = false;
        }
    }
}
