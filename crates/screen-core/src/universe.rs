//! Named symbol universes and watchlists.
//!
//! A [`UniverseRegistry`] resolves a [`UniverseId`] into an ordered list of
//! holdings. Resolution never fails: an identifier that is not registered is
//! taken to be a literal ticker, so `--universe AAPL` screens a single symbol
//! through the same path as a named universe.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScreenError};
use crate::models::TargetPriceConfig;

/// Identifier of a universe, or a literal symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniverseId(String);

impl UniverseId {
    pub const NASDAQ_100: &'static str = "nasdaq100";
    pub const CRYPTO_TOP_20: &'static str = "crypto_top20";
    pub const MY_WATCHLIST: &'static str = "my_watchlist";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniverseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UniverseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Registry of universe definitions.
#[derive(Debug, Clone, Default)]
pub struct UniverseRegistry {
    universes: HashMap<UniverseId, Vec<TargetPriceConfig>>,
}

impl UniverseRegistry {
    /// An empty registry; every identifier resolves as a literal symbol.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in universes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register(
            UniverseId::new(UniverseId::NASDAQ_100),
            ["AAPL", "MSFT", "AMZN", "GOOGL", "GOOG", "NVDA", "META", "TSLA"]
                .into_iter()
                .map(TargetPriceConfig::symbol)
                .collect(),
        );

        registry.register(
            UniverseId::new(UniverseId::CRYPTO_TOP_20),
            ["BTC-USD", "ETH-USD", "SOL-USD", "XRP-USD", "DOGE-USD"]
                .into_iter()
                .map(TargetPriceConfig::symbol)
                .collect(),
        );

        // Fallback contents until a watchlist file is registered.
        registry.register(
            UniverseId::new(UniverseId::MY_WATCHLIST),
            vec![
                TargetPriceConfig::with_targets("AAPL", Some(200.0), Some(150.0)),
                TargetPriceConfig::with_targets("MSFT", Some(450.0), Some(400.0)),
                TargetPriceConfig::with_targets("TSLA", None, Some(170.0)),
            ],
        );

        registry
    }

    /// Register (or replace) a universe definition.
    pub fn register(&mut self, id: UniverseId, holdings: Vec<TargetPriceConfig>) {
        tracing::debug!(universe = %id, holdings = holdings.len(), "universe registered");
        self.universes.insert(id, holdings);
    }

    /// Load a JSON watchlist from `path` and register it under `id`.
    ///
    /// The file holds an array of holdings:
    /// `[{"Symbol": "AAPL", "TargetPriceAbove": 200.0}]`.
    pub fn register_from_file(&mut self, id: UniverseId, path: &Path) -> Result<()> {
        let holdings = load_watchlist(path)?;
        self.register(id, holdings);
        Ok(())
    }

    /// Resolve `id` into its holdings, in definition order.
    pub fn resolve(&self, id: &UniverseId) -> Vec<TargetPriceConfig> {
        match self.universes.get(id) {
            Some(holdings) => holdings.clone(),
            None => vec![TargetPriceConfig::symbol(id.as_str())],
        }
    }

    pub fn contains(&self, id: &UniverseId) -> bool {
        self.universes.contains_key(id)
    }
}

/// Parse a watchlist file.
pub fn load_watchlist(path: &Path) -> Result<Vec<TargetPriceConfig>> {
    let content = std::fs::read_to_string(path).map_err(|source| ScreenError::WatchlistRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Default watchlist location, `~/.ticker-screen/watchlist.json`.
pub fn default_watchlist_path() -> Option<PathBuf> {
    Some(
        dirs::home_dir()?
            .join(".ticker-screen")
            .join("watchlist.json"),
    )
}
