use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the screener and the live orchestrator.
#[derive(Error, Debug)]
pub enum ScreenError {
    /// The upstream bulk fetch for a universe failed.
    #[error("Failed to fetch quotes for universe {universe}: {source}")]
    Fetch {
        universe: String,
        #[source]
        source: anyhow::Error,
    },

    /// The quote monitor could not be created, configured or armed.
    #[error("Failed to {stage} live monitor: {source}")]
    MonitorSetup {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The caller cancelled the run before it was armed.
    #[error("Screen cancelled before it completed")]
    Cancelled,

    /// A non-fatal problem reported by a running quote monitor.
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// A watchlist file could not be read from disk.
    #[error("Failed to read watchlist file {path}: {source}")]
    WatchlistRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScreenError {
    /// Wrap a monitor failure with the lifecycle stage it happened in.
    pub fn monitor_setup(stage: &'static str, source: anyhow::Error) -> Self {
        Self::MonitorSetup { stage, source }
    }

    /// `true` for errors that end a run; streaming errors are informational.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Streaming(_))
    }
}

/// Convenience alias used throughout the screener crates.
pub type Result<T> = std::result::Result<T, ScreenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_fetch() {
        let err = ScreenError::Fetch {
            universe: "nasdaq100".to_string(),
            source: anyhow::anyhow!("upstream timed out"),
        };
        let msg = err.to_string();
        assert!(msg.contains("nasdaq100"));
        assert!(msg.contains("upstream timed out"));
    }

    #[test]
    fn test_error_display_monitor_setup() {
        let err = ScreenError::monitor_setup("arm", anyhow::anyhow!("no runtime"));
        assert_eq!(err.to_string(), "Failed to arm live monitor: no runtime");
    }

    #[test]
    fn test_error_display_watchlist_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ScreenError::WatchlistRead {
            path: PathBuf::from("/some/watchlist.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("/some/watchlist.json"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_streaming_errors_are_not_fatal() {
        assert!(!ScreenError::Streaming("socket reset".to_string()).is_fatal());
        assert!(ScreenError::Config("bad".to_string()).is_fatal());
    }

    #[test]
    fn test_error_display_cancelled() {
        assert_eq!(
            ScreenError::Cancelled.to_string(),
            "Screen cancelled before it completed"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: ScreenError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
