//! Version tokens that tie quote updates to one arming of a monitor.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use screen_core::models::AssetQuote;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Opaque token minted each time a monitor is armed with an asset group.
///
/// Updates carrying any other token belong to a superseded configuration and
/// are discarded before reaching consumers. Tokens are only comparable for
/// equality; their numeric value carries no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionToken(u64);

impl VersionToken {
    /// Mint a token distinct from every previously minted one in this process.
    pub fn mint() -> Self {
        Self(NEXT_VERSION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A live quote in transit, tagged with the version it was produced under.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub quote: AssetQuote,
    pub version: VersionToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_minted_tokens_are_distinct() {
        let tokens: HashSet<VersionToken> = (0..1_000).map(|_| VersionToken::mint()).collect();
        assert_eq!(tokens.len(), 1_000);
    }

    #[test]
    fn test_minted_tokens_are_distinct_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| VersionToken::mint()).collect::<Vec<_>>()))
            .collect();
        let all: HashSet<VersionToken> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 1_000);
    }
}
