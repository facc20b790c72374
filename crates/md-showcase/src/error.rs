use md_showcase_syntax::SyntaxError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShowcaseError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("failed to read config file {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid log filter `{filter}`")]
    LogFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to open log file {}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
