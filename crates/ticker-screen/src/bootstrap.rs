use std::path::{Path, PathBuf};

use screen_core::universe::default_watchlist_path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` value onto an [`EnvFilter`] directive.
///
/// Unrecognised values are passed through so that full directives such as
/// `screen_runtime=trace` keep working.
fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr; stdout is reserved for rendered quotes and alerts.
/// Falls back to `"warn"` if the level string is not a valid directive.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    Ok(())
}

// ── Watchlist discovery ────────────────────────────────────────────────────────

/// Pick the watchlist file to register as `my_watchlist`.
///
/// An explicit path is always returned, even if it does not exist, so that
/// the caller can report the problem. Otherwise
/// `~/.ticker-screen/watchlist.json` is used when present.
pub fn discover_watchlist(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    default_watchlist_path().filter(|p| p.is_file())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
