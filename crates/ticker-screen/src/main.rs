mod bootstrap;
mod live;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use screen_core::formatting::render_quotes;
use screen_core::settings::Settings;
use screen_core::universe::{UniverseId, UniverseRegistry};
use screen_data::market::{SimulatedFetcher, SimulatedMarket};
use screen_data::screener::Screener;
use screen_runtime::orchestrator::{LiveOptions, LiveScreener};
use screen_runtime::simulated::SimulatedMonitorFactory;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("ticker-screen v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Universe: {}, live: {}, format: {}",
        settings.universe,
        settings.live,
        settings.format
    );

    let mut registry = UniverseRegistry::with_builtins();
    if let Some(path) = bootstrap::discover_watchlist(settings.watchlist_file.as_deref()) {
        match registry.register_from_file(UniverseId::new(UniverseId::MY_WATCHLIST), &path) {
            Ok(()) => tracing::info!(path = %path.display(), "watchlist loaded"),
            Err(e) => tracing::warn!(error = %e, "ignoring watchlist file"),
        }
    }

    // Fresh walk each run; opening prices are still per-symbol deterministic.
    let seed = chrono::Utc::now().timestamp_millis().unsigned_abs();
    let market = Arc::new(SimulatedMarket::new(seed));
    let fetcher = Arc::new(SimulatedFetcher::new(Arc::clone(&market)));
    let screener = Screener::new(fetcher, Arc::new(registry));

    if settings.live {
        tracing::info!("Starting live screen...");
        let options = LiveOptions {
            refresh_interval: settings.refresh_interval(),
            ..LiveOptions::default()
        };
        let live = LiveScreener::new(screener, Arc::new(SimulatedMonitorFactory::new(market)))
            .with_options(options);
        return live::run(live, &settings).await;
    }

    let quotes = screener
        .run(&settings.universe_id(), &settings.filters())
        .await
        .context("Error running screener")?;

    let mut stdout = std::io::stdout().lock();
    render_quotes(&mut stdout, &quotes, settings.output_format())?;
    stdout.flush()?;

    Ok(())
}
