//! Screening predicates over [`AssetQuote`]s.
//!
//! Every filter treats a bound `<= 0` as "unbounded on that side", matching
//! the command-line convention where an omitted flag defaults to zero.

use std::fmt::Debug;

use crate::models::AssetQuote;

/// A single screening criterion.
pub trait Filter: Debug + Send + Sync {
    /// `true` when `quote` passes this criterion.
    fn apply(&self, quote: &AssetQuote) -> bool;
}

/// Check `value` against optional `min` / `max` bounds.
fn within_bounds(value: f64, min: f64, max: f64) -> bool {
    if min > 0.0 && value < min {
        return false;
    }
    if max > 0.0 && value > max {
        return false;
    }
    true
}

/// Filters assets by market capitalisation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketCapFilter {
    pub min: f64,
    pub max: f64,
}

impl Filter for MarketCapFilter {
    fn apply(&self, quote: &AssetQuote) -> bool {
        within_bounds(quote.quote_extended.market_cap, self.min, self.max)
    }
}

/// Filters assets by last price.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceFilter {
    pub min: f64,
    pub max: f64,
}

impl Filter for PriceFilter {
    fn apply(&self, quote: &AssetQuote) -> bool {
        within_bounds(quote.price(), self.min, self.max)
    }
}

/// Conjunction of filters. An empty conjunction accepts everything.
///
/// Evaluation stops at the first rejecting filter; the outcome does not
/// depend on the order of `filters`.
#[derive(Debug, Default)]
pub struct AllOf {
    filters: Vec<Box<dyn Filter>>,
}

impl AllOf {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self { filters }
    }

    /// Append another criterion.
    pub fn and(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Filter for AllOf {
    fn apply(&self, quote: &AssetQuote) -> bool {
        self.filters.iter().all(|f| f.apply(quote))
    }
}

/// Build the filter set implied by command-line bounds.
///
/// A filter is only added when at least one of its bounds is set.
pub fn from_bounds(min_market_cap: f64, max_market_cap: f64, min_price: f64, max_price: f64) -> AllOf {
    let mut filters = AllOf::default();
    if min_market_cap > 0.0 || max_market_cap > 0.0 {
        filters = filters.and(MarketCapFilter {
            min: min_market_cap,
            max: max_market_cap,
        });
    }
    if min_price > 0.0 || max_price > 0.0 {
        filters = filters.and(PriceFilter {
            min: min_price,
            max: max_price,
        });
    }
    filters
}
