//! Live runtime for the ticker screener.
//!
//! Hosts the [`Monitor`](monitor::Monitor) capability, the version-gated
//! [`LiveScreener`](orchestrator::LiveScreener) that relays monitor output
//! onto bounded channels, and a simulated monitor for offline use.

pub mod monitor;
pub mod orchestrator;
pub mod queue;
pub mod routing;
pub mod simulated;
pub mod version;

pub use screen_core as core;
pub use screen_data as data;
