use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::ShowcaseError;

/// Environment variable whose directives replace the configured log filter.
pub const LOG_ENV: &str = "MD_SHOWCASE_LOG";

/// Picks the filter directives: the environment wins over the configured value.
pub fn build_filter(env: Option<&str>, configured: &str) -> Result<EnvFilter, ShowcaseError> {
    let directives = env
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(configured);
    EnvFilter::try_new(directives).map_err(|source| ShowcaseError::LogFilter {
        filter: directives.to_string(),
        source,
    })
}

/// Installs the global subscriber. Without a log file, events are filtered and dropped: the
/// terminal UI owns stdout and stderr.
pub fn init(configured: &str, log_file: Option<&Path>) -> Result<(), ShowcaseError> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(env.as_deref(), configured)?;

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|source| ShowcaseError::LogFile {
                path: path.to_path_buf(),
                source,
            })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_configured_filter() {
        let filter = build_filter(Some("md_showcase=trace"), "md_showcase=info").expect("filter");
        assert_eq!(filter.to_string(), "md_showcase=trace");
    }

    #[test]
    fn blank_environment_falls_back() {
        let filter = build_filter(Some("  "), "warn").expect("filter");
        assert_eq!(filter.to_string(), "warn");
        assert!(build_filter(None, "debug").is_ok());
    }

    #[test]
    fn rejects_invalid_directives() {
        let err = build_filter(None, "md_showcase=loud").expect_err("invalid level");
        assert!(err.to_string().contains("md_showcase=loud"));
    }

    #[test]
    fn writes_to_log_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("showcase.log");
        init("md_showcase=debug", Some(&path)).expect("init");
        tracing::info!(marker = 42, "log file smoke event");
        let written = std::fs::read_to_string(&path).expect("read log");
        assert!(written.contains("log file smoke event"), "{written}");
        assert!(written.contains("marker=42"), "{written}");
    }
}
