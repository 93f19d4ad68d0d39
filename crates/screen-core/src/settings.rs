use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::filter::{self, AllOf};
use crate::formatting::OutputFormat;
use crate::models::TargetPrices;
use crate::universe::UniverseId;

/// Default live refresh cadence in seconds.
pub const DEFAULT_REFRESH_SECS: u64 = 15;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Screen for assets and optionally stream live price updates
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ticker-screen",
    about = "Screen for assets and optionally stream live price updates",
    after_help = "Examples:\n  ticker-screen --universe nasdaq100 --min-market-cap 100000000000\n  ticker-screen --universe AAPL --target-price-above 200 --target-price-below 120 --live",
    version
)]
pub struct Settings {
    /// Asset universe to screen (e.g. nasdaq100, crypto_top20) or a single symbol
    #[arg(long, env = "TICKER_SCREEN_UNIVERSE", default_value = "nasdaq100")]
    pub universe: String,

    /// Minimum market cap
    #[arg(long, default_value = "0")]
    pub min_market_cap: f64,

    /// Maximum market cap
    #[arg(long, default_value = "0")]
    pub max_market_cap: f64,

    /// Minimum price
    #[arg(long, default_value = "0")]
    pub min_price: f64,

    /// Maximum price
    #[arg(long, default_value = "0")]
    pub max_price: f64,

    /// Enable live price streaming
    #[arg(long)]
    pub live: bool,

    /// Target price for above alerts (single-symbol live screens)
    #[arg(long, default_value = "0")]
    pub target_price_above: f64,

    /// Target price for below alerts (single-symbol live screens)
    #[arg(long, default_value = "0")]
    pub target_price_below: f64,

    /// Refresh interval in seconds (live mode)
    #[arg(long, env = "TICKER_SCREEN_REFRESH", default_value_t = DEFAULT_REFRESH_SECS)]
    pub refresh: u64,

    /// Path to a JSON file defining the my_watchlist universe
    #[arg(long, env = "TICKER_SCREEN_WATCHLIST")]
    pub watchlist_file: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "json", value_parser = ["json", "csv"])]
    pub format: String,

    /// Logging level
    #[arg(long, env = "TICKER_SCREEN_LOG", default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply `--debug`.
    pub fn load() -> Self {
        Self::load_from(std::env::args_os())
    }

    /// Same as [`Settings::load`] but from an explicit argument list.
    pub fn load_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    pub fn universe_id(&self) -> UniverseId {
        UniverseId::new(self.universe.clone())
    }

    /// Filters implied by the market-cap and price bounds.
    pub fn filters(&self) -> AllOf {
        filter::from_bounds(
            self.min_market_cap,
            self.max_market_cap,
            self.min_price,
            self.max_price,
        )
    }

    /// Ad-hoc thresholds for single-symbol live screens.
    pub fn ad_hoc_targets(&self) -> TargetPrices {
        TargetPrices::from_flags(self.target_price_above, self.target_price_below)
    }

    /// Live refresh cadence; zero falls back to the default.
    pub fn refresh_interval(&self) -> Duration {
        if self.refresh == 0 {
            Duration::from_secs(DEFAULT_REFRESH_SECS)
        } else {
            Duration::from_secs(self.refresh)
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_name(&self.format)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::load_from(["ticker-screen"]);

        assert_eq!(settings.min_market_cap, 0.0);
        assert_eq!(settings.max_price, 0.0);
        assert!(!settings.live);
        assert_eq!(settings.format, "json");
        assert!(settings.watchlist_file.is_none());
        assert!(settings.filters().is_empty());
        assert!(settings.ad_hoc_targets().is_empty());
    }

    #[test]
    fn test_settings_live_single_symbol() {
        let settings = Settings::load_from([
            "ticker-screen",
            "--universe=AAPL",
            "--target-price-above=200.00",
            "--target-price-below=120.00",
            "--live",
        ]);
        assert!(settings.live);
        assert_eq!(settings.universe_id().as_str(), "AAPL");
        let targets = settings.ad_hoc_targets();
        assert_eq!(targets.above, Some(200.0));
        assert_eq!(targets.below, Some(120.0));
    }

    #[test]
    fn test_settings_filters_from_bounds() {
        let settings = Settings::load_from([
            "ticker-screen",
            "--min-market-cap",
            "100000000000",
            "--max-price",
            "500",
        ]);
        assert_eq!(settings.filters().len(), 2);
    }

    #[test]
    fn test_settings_zero_refresh_uses_default() {
        let settings = Settings::load_from(["ticker-screen", "--refresh", "0"]);
        assert_eq!(
            settings.refresh_interval(),
            Duration::from_secs(DEFAULT_REFRESH_SECS)
        );
    }

    #[test]
    fn test_settings_debug_overrides_log_level() {
        let settings = Settings::load_from(["ticker-screen", "--debug"]);
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_settings_csv_format() {
        let settings = Settings::load_from(["ticker-screen", "--format", "csv"]);
        assert_eq!(settings.output_format(), OutputFormat::Csv);
    }
}
