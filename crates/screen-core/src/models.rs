use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream quote-provider category serving a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    /// Equities and ETFs, served by a polling REST provider.
    #[default]
    Equity,
    /// Crypto pairs, served by a streaming push provider.
    Crypto,
}

impl QuoteSource {
    /// Suffix heuristic: `BTC-USD` and `ETH-USDT` style pairs are crypto,
    /// everything else is an equity. Pure and total; never touches the network.
    pub fn from_symbol(symbol: &str) -> Self {
        let upper = symbol.to_ascii_uppercase();
        if upper.contains("-USD") {
            Self::Crypto
        } else {
            Self::Equity
        }
    }
}

impl fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equity => f.write_str("equity"),
            Self::Crypto => f.write_str("crypto"),
        }
    }
}

/// Price block of a quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotePrice {
    /// Last traded price.
    pub price: f64,
    /// Absolute change against the previous close.
    #[serde(default)]
    pub change: f64,
    /// Percentage change against the previous close.
    #[serde(default)]
    pub change_percent: f64,
    /// Previous session close.
    #[serde(default)]
    pub price_prev_close: f64,
}

/// Fundamentals and volume that are not part of every tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteExtended {
    /// Market capitalisation in the quote currency.
    #[serde(default)]
    pub market_cap: f64,
    /// Traded volume for the current session.
    #[serde(default)]
    pub volume: f64,
    /// Currency the prices are denominated in.
    #[serde(default)]
    pub currency: String,
}

/// Optional above / below alert thresholds for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetPrices {
    pub above: Option<f64>,
    pub below: Option<f64>,
}

impl TargetPrices {
    /// No thresholds configured.
    pub const NONE: TargetPrices = TargetPrices {
        above: None,
        below: None,
    };

    /// Build thresholds from raw command-line values where `<= 0` means unset.
    pub fn from_flags(above: f64, below: f64) -> Self {
        Self {
            above: (above > 0.0).then_some(above),
            below: (below > 0.0).then_some(below),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.above.is_none() && self.below.is_none()
    }

    /// Return `self` with every configured side of `other` taking precedence.
    pub fn overlay(self, other: TargetPrices) -> Self {
        Self {
            above: other.above.or(self.above),
            below: other.below.or(self.below),
        }
    }
}

/// One quote for one symbol, as fetched or streamed from a provider.
///
/// Identity is [`AssetQuote::symbol`]. Once a quote has been handed to a
/// channel it is never mutated; newer observations replace it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub source: QuoteSource,
    pub quote_price: QuotePrice,
    #[serde(default)]
    pub quote_extended: QuoteExtended,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price_above: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price_below: Option<f64>,
}

impl AssetQuote {
    /// Current price shortcut.
    pub fn price(&self) -> f64 {
        self.quote_price.price
    }

    /// Thresholds currently merged onto this quote.
    pub fn targets(&self) -> TargetPrices {
        TargetPrices {
            above: self.target_price_above,
            below: self.target_price_below,
        }
    }

    /// Replace both thresholds, clearing a side that `targets` leaves unset.
    pub fn set_targets(&mut self, targets: TargetPrices) {
        self.target_price_above = targets.above;
        self.target_price_below = targets.below;
    }

    /// Override only the sides that `targets` configures.
    pub fn override_targets(&mut self, targets: TargetPrices) {
        self.set_targets(self.targets().overlay(targets));
    }
}

/// A universe holding: a symbol plus its universe-defined thresholds.
///
/// Field names follow the watchlist file format
/// (`{"Symbol": "AAPL", "TargetPriceAbove": 200.0}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetPriceConfig {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price_above: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price_below: Option<f64>,
}

impl TargetPriceConfig {
    /// A holding with no thresholds.
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            target_price_above: None,
            target_price_below: None,
        }
    }

    /// A holding with explicit thresholds.
    pub fn with_targets(symbol: impl Into<String>, above: Option<f64>, below: Option<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            target_price_above: above,
            target_price_below: below,
        }
    }

    pub fn targets(&self) -> TargetPrices {
        TargetPrices {
            above: self.target_price_above,
            below: self.target_price_below,
        }
    }
}

/// Symbols of one asset group served by a single source.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolsBySource {
    pub source: QuoteSource,
    pub symbols: Vec<String>,
}

/// A named set of symbols partitioned by the source that serves them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetGroup {
    pub name: String,
    /// Every symbol of the group in screening order.
    pub symbols: Vec<String>,
    /// Non-empty per-source buckets.
    pub symbols_by_source: Vec<SymbolsBySource>,
}

impl AssetGroup {
    /// Symbols assigned to `source`, or an empty slice.
    pub fn symbols_for(&self, source: QuoteSource) -> &[String] {
        self.symbols_by_source
            .iter()
            .find(|bucket| bucket.source == source)
            .map(|bucket| bucket.symbols.as_slice())
            .unwrap_or(&[])
    }
}

/// Snapshot of every quote in an asset group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetGroupQuote {
    pub name: String,
    pub quotes: Vec<AssetQuote>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote_with_targets(above: Option<f64>, below: Option<f64>) -> AssetQuote {
        AssetQuote {
            symbol: "AAPL".to_string(),
            target_price_above: above,
            target_price_below: below,
            ..Default::default()
        }
    }

    #[test]
    fn test_quote_source_from_symbol() {
        assert_eq!(QuoteSource::from_symbol("BTC-USD"), QuoteSource::Crypto);
        assert_eq!(QuoteSource::from_symbol("eth-usdt"), QuoteSource::Crypto);
        assert_eq!(QuoteSource::from_symbol("AAPL"), QuoteSource::Equity);
        assert_eq!(QuoteSource::from_symbol("BRK-B"), QuoteSource::Equity);
        assert_eq!(QuoteSource::from_symbol(""), QuoteSource::Equity);
    }

    #[test]
    fn test_target_prices_from_flags_ignores_non_positive() {
        let t = TargetPrices::from_flags(200.0, 0.0);
        assert_eq!(t.above, Some(200.0));
        assert_eq!(t.below, None);
        assert!(TargetPrices::from_flags(-1.0, 0.0).is_empty());
    }

    #[test]
    fn test_overlay_prefers_configured_sides_of_other() {
        let base = TargetPrices {
            above: Some(100.0),
            below: Some(80.0),
        };
        let merged = base.overlay(TargetPrices {
            above: Some(150.0),
            below: None,
        });
        assert_eq!(merged.above, Some(150.0));
        assert_eq!(merged.below, Some(80.0));
    }

    #[test]
    fn test_set_targets_replaces_both_sides() {
        let mut q = quote_with_targets(Some(1.0), Some(2.0));
        q.set_targets(TargetPrices {
            above: Some(3.0),
            below: None,
        });
        assert_eq!(q.target_price_above, Some(3.0));
        assert_eq!(q.target_price_below, None);
    }

    #[test]
    fn test_override_targets_keeps_unset_sides() {
        let mut q = quote_with_targets(Some(1.0), Some(2.0));
        q.override_targets(TargetPrices {
            above: None,
            below: Some(5.0),
        });
        assert_eq!(q.targets().above, Some(1.0));
        assert_eq!(q.targets().below, Some(5.0));
    }

    #[test]
    fn test_target_price_config_watchlist_field_names() {
        let json = r#"{"Symbol":"TSLA","TargetPriceBelow":170.0}"#;
        let cfg: TargetPriceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.symbol, "TSLA");
        assert_eq!(cfg.target_price_above, None);
        assert_eq!(cfg.target_price_below, Some(170.0));
    }

    #[test]
    fn test_asset_group_symbols_for_missing_source_is_empty() {
        let group = AssetGroup {
            name: "g".to_string(),
            symbols: vec!["AAPL".to_string()],
            symbols_by_source: vec![SymbolsBySource {
                source: QuoteSource::Equity,
                symbols: vec!["AAPL".to_string()],
            }],
        };
        assert_eq!(group.symbols_for(QuoteSource::Equity), ["AAPL".to_string()]);
        assert!(group.symbols_for(QuoteSource::Crypto).is_empty());
    }
}
