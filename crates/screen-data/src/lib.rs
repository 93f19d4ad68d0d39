//! Quote acquisition layer for the ticker screener.
//!
//! Defines the bulk [`Fetcher`](fetcher::Fetcher) capability, the one-shot
//! [`Screener`](screener::Screener) pipeline built on top of it, and a
//! simulated market that stands in for real quote providers.

pub mod fetcher;
pub mod market;
pub mod screener;

pub use screen_core as core;
