//! Simulated quote provider.
//!
//! [`SimulatedMarket`] synthesises quotes with a small random walk around the
//! last price so the screener and the live view can run without network
//! access. Starting prices and fundamentals are derived from the symbol, so a
//! given symbol always opens at the same price. [`SimulatedFetcher`] serves
//! bulk requests from the market.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use screen_core::models::{AssetQuote, QuoteExtended, QuotePrice, QuoteSource};

use crate::fetcher::Fetcher;

/// Largest relative move of a single tick.
const MAX_TICK_MOVE: f64 = 0.004;

/// Display names for well-known symbols.
const KNOWN_NAMES: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("AMZN", "Amazon.com, Inc."),
    ("GOOGL", "Alphabet Inc. Class A"),
    ("GOOG", "Alphabet Inc. Class C"),
    ("NVDA", "NVIDIA Corporation"),
    ("META", "Meta Platforms, Inc."),
    ("TSLA", "Tesla, Inc."),
    ("BTC-USD", "Bitcoin USD"),
    ("ETH-USD", "Ethereum USD"),
    ("SOL-USD", "Solana USD"),
    ("XRP-USD", "XRP USD"),
    ("DOGE-USD", "Dogecoin USD"),
];

struct MarketState {
    rng: StdRng,
    quotes: HashMap<String, AssetQuote>,
    halted: HashSet<String>,
}

/// Shared random-walk market.
pub struct SimulatedMarket {
    state: Mutex<MarketState>,
}

impl SimulatedMarket {
    /// Create a market whose tick sequence is reproducible for `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            state: Mutex::new(MarketState {
                rng: StdRng::seed_from_u64(seed),
                quotes: HashMap::new(),
                halted: HashSet::new(),
            }),
        }
    }

    /// Current quote for `symbol`, listing it on first use.
    pub fn quote(&self, symbol: &str) -> AssetQuote {
        let mut state = self.state.lock();
        state
            .quotes
            .entry(symbol.to_string())
            .or_insert_with(|| opening_quote(symbol))
            .clone()
    }

    /// Advance `symbol` by one random-walk step and return the new quote.
    pub fn tick(&self, symbol: &str) -> AssetQuote {
        let mut state = self.state.lock();
        let MarketState { rng, quotes, .. } = &mut *state;
        let step = rng.random_range(-MAX_TICK_MOVE..=MAX_TICK_MOVE);

        let quote = quotes
            .entry(symbol.to_string())
            .or_insert_with(|| opening_quote(symbol));
        let price = (quote.price() * (1.0 + step)).max(0.01);
        reprice(quote, price);
        quote.clone()
    }

    /// Like [`tick`](Self::tick), but fails while `symbol` is halted.
    pub fn try_tick(&self, symbol: &str) -> anyhow::Result<AssetQuote> {
        if self.is_halted(symbol) {
            anyhow::bail!("trading halted for {symbol}");
        }
        Ok(self.tick(symbol))
    }

    /// Suspend streaming for `symbol` until [`resume`](Self::resume).
    pub fn halt(&self, symbol: &str) {
        self.state.lock().halted.insert(symbol.to_string());
    }

    pub fn resume(&self, symbol: &str) {
        self.state.lock().halted.remove(symbol);
    }

    pub fn is_halted(&self, symbol: &str) -> bool {
        self.state.lock().halted.contains(symbol)
    }

    /// Force the price of `symbol`.
    pub fn set_price(&self, symbol: &str, price: f64) {
        let mut state = self.state.lock();
        let quote = state
            .quotes
            .entry(symbol.to_string())
            .or_insert_with(|| opening_quote(symbol));
        reprice(quote, price);
    }
}

impl Default for SimulatedMarket {
    fn default() -> Self {
        Self::new(0x5eed)
    }
}

/// Update price-derived fields, keeping the share count implied by the
/// previous market cap.
fn reprice(quote: &mut AssetQuote, price: f64) {
    let old_price = quote.price();
    if old_price > 0.0 {
        quote.quote_extended.market_cap *= price / old_price;
    }
    let prev_close = quote.quote_price.price_prev_close;
    quote.quote_price.price = price;
    quote.quote_price.change = price - prev_close;
    quote.quote_price.change_percent = if prev_close > 0.0 {
        (price - prev_close) / prev_close * 100.0
    } else {
        0.0
    };
}

/// FNV-1a over the symbol bytes.
fn symbol_hash(symbol: &str) -> u64 {
    symbol.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn opening_quote(symbol: &str) -> AssetQuote {
    let hash = symbol_hash(symbol);
    let source = QuoteSource::from_symbol(symbol);

    let price = match source {
        QuoteSource::Equity => 20.0 + (hash % 78_000) as f64 / 100.0,
        QuoteSource::Crypto => 0.1 + (hash % 6_000_000) as f64 / 100.0,
    };
    let shares = 1e8 + ((hash >> 24) % 15_900) as f64 * 1e6;

    let name = KNOWN_NAMES
        .iter()
        .find(|(known, _)| *known == symbol)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| symbol.to_string());

    AssetQuote {
        symbol: symbol.to_string(),
        name,
        source,
        quote_price: QuotePrice {
            price,
            change: 0.0,
            change_percent: 0.0,
            price_prev_close: price,
        },
        quote_extended: QuoteExtended {
            market_cap: price * shares,
            volume: ((hash >> 40) % 50_000_000) as f64,
            currency: "USD".to_string(),
        },
        target_price_above: None,
        target_price_below: None,
    }
}

// ── SimulatedFetcher ──────────────────────────────────────────────────────────

/// [`Fetcher`] backed by a [`SimulatedMarket`].
#[derive(Clone)]
pub struct SimulatedFetcher {
    market: Arc<SimulatedMarket>,
}

impl SimulatedFetcher {
    pub fn new(market: Arc<SimulatedMarket>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Fetcher for SimulatedFetcher {
    async fn fetch(&self, symbols: &[String]) -> anyhow::Result<Vec<AssetQuote>> {
        Ok(symbols.iter().map(|s| self.market.quote(s)).collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
