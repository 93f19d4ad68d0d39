//! Core domain types for the ticker screener.
//!
//! Quote and universe models, screening filters, the price-alert engine and
//! its sinks, quote-set rendering and command-line settings. Nothing in this
//! crate performs I/O against quote providers.

pub mod alert;
pub mod error;
pub mod filter;
pub mod formatting;
pub mod models;
pub mod notifications;
pub mod settings;
pub mod universe;

pub use error::{Result, ScreenError};
