//! Bulk quote fetching capability.

use async_trait::async_trait;
use screen_core::models::AssetQuote;

/// Fetches quotes for a set of symbols in one request.
///
/// Implementations are all-or-nothing: either every available quote is
/// returned or the call fails. Symbols unknown to the provider may simply be
/// absent from the result.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, symbols: &[String]) -> anyhow::Result<Vec<AssetQuote>>;
}
