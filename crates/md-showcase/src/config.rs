//! Showcase configuration, loaded from an optional TOML file.
//!
//! Every key is optional; missing sections and keys take their defaults.

use md_showcase_core::code_view::CodeViewOptions;
use md_showcase_markdown::MarkdownViewOptions;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::ShowcaseError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub code: CodeConfig,
    pub markdown: MarkdownConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    /// Highlighting theme name or alias (default: `docco`).
    pub theme: String,
    pub show_line_numbers: bool,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            theme: "docco".to_string(),
            show_line_numbers: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    pub padding_left: u16,
    pub padding_right: u16,
    pub show_heading_markers: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            padding_left: 1,
            padding_right: 1,
            show_heading_markers: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directives, overridden by `MD_SHOWCASE_LOG`.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "md_showcase=info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ShowcaseError> {
        let raw = fs::read_to_string(path).map_err(|source| ShowcaseError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ShowcaseError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Renders the effective configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn markdown_options(&self) -> MarkdownViewOptions {
        MarkdownViewOptions {
            padding_left: self.markdown.padding_left,
            padding_right: self.markdown.padding_right,
            show_heading_markers: self.markdown.show_heading_markers,
            ..MarkdownViewOptions::default()
        }
    }

    pub fn code_options(&self) -> CodeViewOptions {
        CodeViewOptions {
            show_line_numbers: self.code.show_line_numbers,
            ..CodeViewOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.code.theme, "docco");
        assert!(!config.code.show_line_numbers);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[code]
show_line_numbers = true

[markdown]
padding_left = 3
"#,
        )
        .expect("parse");
        assert_eq!(config.code.theme, "docco");
        assert!(config.code.show_line_numbers);
        assert_eq!(config.markdown.padding_left, 3);
        assert_eq!(config.markdown.padding_right, 1);
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[code]\ntheme = \"github\"\n[log]\nfilter = \"debug\"").expect("write");
        let config = Config::load(file.path()).expect("load");
        assert_eq!(config.code.theme, "github");
        assert_eq!(config.log.filter, "debug");
    }

    #[test]
    fn reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let err = Config::load(&missing).expect_err("missing file");
        assert!(matches!(err, ShowcaseError::ConfigRead { .. }));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[code]\nshow_line_numbers = \"yes\"\n").expect("write");
        let err = Config::load(&bad).expect_err("bad file");
        assert!(matches!(err, ShowcaseError::ConfigParse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn effective_config_prints_as_toml() {
        let text = Config::default().to_toml().expect("serialize");
        assert!(text.contains("[code]"));
        assert!(text.contains("theme = \"docco\""));
        let back: Config = toml::from_str(&text).expect("parse back");
        assert_eq!(back, Config::default());
    }

    #[test]
    fn maps_onto_widget_options() {
        let mut config = Config::default();
        config.markdown.show_heading_markers = true;
        config.code.show_line_numbers = true;
        let md = config.markdown_options();
        assert_eq!((md.padding_left, md.padding_right), (1, 1));
        assert!(md.show_heading_markers);
        assert!(config.code_options().show_line_numbers);
    }
}
