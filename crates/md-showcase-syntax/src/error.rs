use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("unknown highlighting theme `{name}` (available: {})", .available.join(", "))]
    UnknownTheme { name: String, available: Vec<String> },
}
