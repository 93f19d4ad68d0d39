//! Assignment of symbols to quote sources.

use screen_core::models::{AssetGroup, QuoteSource, SymbolsBySource};

/// Policy deciding which source serves a symbol.
///
/// Must be pure and total: every symbol maps to exactly one source, without
/// I/O.
pub trait SourceRouter: Send + Sync {
    fn classify(&self, symbol: &str) -> QuoteSource;
}

/// Default policy: `-USD` / `-USDT` pairs are crypto, everything else equity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixRouter;

impl SourceRouter for SuffixRouter {
    fn classify(&self, symbol: &str) -> QuoteSource {
        QuoteSource::from_symbol(symbol)
    }
}

impl<F> SourceRouter for F
where
    F: Fn(&str) -> QuoteSource + Send + Sync,
{
    fn classify(&self, symbol: &str) -> QuoteSource {
        self(symbol)
    }
}

/// Build an asset group, bucketing `symbols` by source.
///
/// Buckets keep the input order and empty buckets are omitted; equities come
/// before crypto.
pub fn partition(name: &str, symbols: &[String], router: &dyn SourceRouter) -> AssetGroup {
    let mut equities = Vec::new();
    let mut crypto = Vec::new();
    for symbol in symbols {
        match router.classify(symbol) {
            QuoteSource::Equity => equities.push(symbol.clone()),
            QuoteSource::Crypto => crypto.push(symbol.clone()),
        }
    }

    let symbols_by_source = [(QuoteSource::Equity, equities), (QuoteSource::Crypto, crypto)]
        .into_iter()
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(source, symbols)| SymbolsBySource { source, symbols })
        .collect();

    AssetGroup {
        name: name.to_string(),
        symbols: symbols.to_vec(),
        symbols_by_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_partition_mixed_symbols() {
        let group = partition(
            "live",
            &owned(&["AAPL", "BTC-USD", "MSFT", "ETH-USDT"]),
            &SuffixRouter,
        );
        assert_eq!(group.symbols.len(), 4);
        assert_eq!(group.symbols_for(QuoteSource::Equity), owned(&["AAPL", "MSFT"]));
        assert_eq!(group.symbols_for(QuoteSource::Crypto), owned(&["BTC-USD", "ETH-USDT"]));
    }

    #[test]
    fn test_partition_omits_empty_buckets() {
        let group = partition("live", &owned(&["BTC-USD"]), &SuffixRouter);
        assert_eq!(group.symbols_by_source.len(), 1);
        assert_eq!(group.symbols_by_source[0].source, QuoteSource::Crypto);
    }

    #[test]
    fn test_every_symbol_lands_in_exactly_one_bucket() {
        let symbols = owned(&["A", "B-USD", "C", "d-usd", "E-EUR"]);
        let group = partition("g", &symbols, &SuffixRouter);
        let total: usize = group.symbols_by_source.iter().map(|b| b.symbols.len()).sum();
        assert_eq!(total, symbols.len());
    }

    #[test]
    fn test_closure_router_can_replace_policy() {
        let everything_crypto = |_: &str| QuoteSource::Crypto;
        let group = partition("g", &owned(&["AAPL", "MSFT"]), &everything_crypto);
        assert!(group.symbols_for(QuoteSource::Equity).is_empty());
        assert_eq!(group.symbols_for(QuoteSource::Crypto).len(), 2);
    }
}
