//! One-shot screening pipeline.
//!
//! [`Screener::run`] resolves a universe, bulk-fetches its quotes, merges the
//! universe-defined target prices onto each quote and keeps the quotes that
//! every filter accepts.

use std::collections::HashMap;
use std::sync::Arc;

use screen_core::error::{Result, ScreenError};
use screen_core::filter::Filter;
use screen_core::models::{AssetQuote, TargetPrices};
use screen_core::universe::{UniverseId, UniverseRegistry};

use crate::fetcher::Fetcher;

/// Resolve → fetch → merge targets → filter.
#[derive(Clone)]
pub struct Screener {
    fetcher: Arc<dyn Fetcher>,
    universes: Arc<UniverseRegistry>,
}

impl Screener {
    pub fn new(fetcher: Arc<dyn Fetcher>, universes: Arc<UniverseRegistry>) -> Self {
        Self { fetcher, universes }
    }

    pub fn universes(&self) -> &UniverseRegistry {
        &self.universes
    }

    /// Run one screen.
    ///
    /// Output order follows the fetcher's iteration order. A fetch failure is
    /// returned as [`ScreenError::Fetch`] naming the universe.
    pub async fn run(&self, universe: &UniverseId, filter: &dyn Filter) -> Result<Vec<AssetQuote>> {
        let holdings = self.universes.resolve(universe);

        let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
        let targets_by_symbol: HashMap<&str, TargetPrices> = holdings
            .iter()
            .map(|h| (h.symbol.as_str(), h.targets()))
            .collect();

        tracing::debug!(universe = %universe, symbols = symbols.len(), "fetching quotes");

        let quotes = self
            .fetcher
            .fetch(&symbols)
            .await
            .map_err(|source| ScreenError::Fetch {
                universe: universe.to_string(),
                source,
            })?;

        let fetched = quotes.len();
        let screened: Vec<AssetQuote> = quotes
            .into_iter()
            .map(|mut quote| {
                if let Some(targets) = targets_by_symbol.get(quote.symbol.as_str()) {
                    quote.set_targets(*targets);
                }
                quote
            })
            .filter(|quote| filter.apply(quote))
            .collect();

        tracing::info!(
            universe = %universe,
            fetched,
            matched = screened.len(),
            "screen complete"
        );

        Ok(screened)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
