//! The `--live` caller loop.
//!
//! Evaluates alerts on the initial snapshot, then multiplexes cancellation,
//! asynchronous errors, quote updates and a periodic snapshot render until
//! the run is cancelled or the updates stream closes.

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context;
use screen_core::alert::AlertEngine;
use screen_core::formatting::{render_quotes, OutputFormat};
use screen_core::models::AssetQuote;
use screen_core::settings::Settings;
use screen_core::ScreenError;
use screen_runtime::orchestrator::{LiveConfig, LiveResult, LiveScreener};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Run a live screen until Ctrl+C / SIGTERM.
pub async fn run(live: LiveScreener, settings: &Settings) -> anyhow::Result<()> {
    let ctx = CancellationToken::new();
    tokio::spawn(cancel_on_signal(ctx.clone()));

    let config = LiveConfig {
        universe: settings.universe_id(),
        filters: settings.filters(),
        ad_hoc: settings.ad_hoc_targets(),
    };
    let result = match live.run(ctx.clone(), config).await {
        Ok(result) => result,
        Err(ScreenError::Cancelled) => {
            println!("Live screen stopped.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Error running live screener"),
    };

    let engine = AlertEngine::new();
    let mut stdout = io::stdout();
    stream(
        ctx,
        result,
        &engine,
        &mut stdout,
        settings.output_format(),
        settings.refresh_interval(),
    )
    .await
    .context("failed to write live output")
}

async fn cancel_on_signal(ctx: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutdown signal received");
    ctx.cancel();
}

/// Consume `result` until `ctx` is cancelled or updates close, then stop it.
pub async fn stream<W: Write>(
    ctx: CancellationToken,
    mut result: LiveResult,
    engine: &AlertEngine,
    out: &mut W,
    format: OutputFormat,
    render_every: Duration,
) -> io::Result<()> {
    let outcome = pump(&ctx, &mut result, engine, out, format, render_every).await;
    let dropped = result.dropped.get();
    if dropped > 0 {
        tracing::info!(dropped, "updates dropped because the consumer fell behind");
    }
    result.stop.stop();
    outcome
}

async fn pump<W: Write>(
    ctx: &CancellationToken,
    result: &mut LiveResult,
    engine: &AlertEngine,
    out: &mut W,
    format: OutputFormat,
    render_every: Duration,
) -> io::Result<()> {
    engine.process(&result.initial);

    if result.initial.is_empty() {
        writeln!(out, "No symbols matched the provided filters.")?;
        return Ok(());
    }

    let mut book = LiveBook::new(&result.initial);
    writeln!(out, "Initial snapshot ({} symbols)", book.len())?;
    render_quotes(out, &result.initial, format)?;

    let mut snapshots = time::interval_at(Instant::now() + render_every, render_every);
    let mut errors_open = true;

    loop {
        tokio::select! {
            biased;

            _ = ctx.cancelled() => {
                writeln!(out, "Live screen stopped.")?;
                return Ok(());
            }
            err = result.errors.recv(), if errors_open => match err {
                Some(e) => tracing::warn!(error = %e, "live screen error"),
                None => errors_open = false,
            },
            update = result.updates.recv() => match update {
                Some(update) => {
                    if let Some(quote) = book.apply(update.quote) {
                        engine.process(std::slice::from_ref(quote));
                    }
                }
                None => {
                    tracing::info!("live updates closed");
                    return Ok(());
                }
            },
            _ = snapshots.tick() => {
                let stamp = chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
                writeln!(out, "\nSnapshot @ {stamp}")?;
                render_quotes(out, &book.snapshot(), format)?;
            }
        }
    }
}

/// Latest quote per symbol, rendered in the order of the initial snapshot.
struct LiveBook {
    order: Vec<String>,
    quotes: HashMap<String, AssetQuote>,
}

impl LiveBook {
    fn new(initial: &[AssetQuote]) -> Self {
        Self {
            order: initial.iter().map(|q| q.symbol.clone()).collect(),
            quotes: initial
                .iter()
                .map(|q| (q.symbol.clone(), q.clone()))
                .collect(),
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    /// Replace the quote for a known symbol; unknown symbols are ignored.
    fn apply(&mut self, quote: AssetQuote) -> Option<&AssetQuote> {
        match self.quotes.get_mut(&quote.symbol) {
            Some(slot) => {
                *slot = quote;
                Some(slot)
            }
            None => {
                tracing::debug!(symbol = %quote.symbol, "update for symbol outside the screen");
                None
            }
        }
    }

    fn snapshot(&self) -> Vec<AssetQuote> {
        self.order
            .iter()
            .filter_map(|symbol| self.quotes.get(symbol).cloned())
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
