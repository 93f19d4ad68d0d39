//! Price-alert notifications and the sinks they are written to.
//!
//! The [`AlertEngine`](crate::alert::AlertEngine) produces [`PriceAlert`]s;
//! an [`AlertSink`] decides where the rendered line goes. The default sink is
//! standard output. Alerts are never persisted.

use std::fmt;
use std::io::{self, Write};

// ── PriceAlert ────────────────────────────────────────────────────────────────

/// Which threshold of a symbol was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    Above,
    Below,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Above => f.write_str("above"),
            Self::Below => f.write_str("below"),
        }
    }
}

/// A single threshold-crossing notification.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAlert {
    pub symbol: String,
    pub boundary: Boundary,
    /// Configured threshold that was reached.
    pub target: f64,
    /// Price of the observation that reached it.
    pub price: f64,
    /// `true` when the symbol had no recorded state before this observation.
    pub first_observation: bool,
}

impl fmt::Display for PriceAlert {
    /// `ALERT: ABC crossed above target price of 100.00. Current price: 110.00`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.first_observation { "is" } else { "crossed" };
        write!(
            f,
            "ALERT: {} {} {} target price of {:.2}. Current price: {:.2}",
            self.symbol, verb, self.boundary, self.target, self.price
        )
    }
}

// ── AlertSink ─────────────────────────────────────────────────────────────────

/// Destination for rendered alerts.
pub trait AlertSink: Send {
    /// Deliver one alert. Failures are reported to the caller, which logs them.
    fn notify(&mut self, alert: &PriceAlert) -> io::Result<()>;
}

/// Writes alerts to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl AlertSink for ConsoleSink {
    fn notify(&mut self, alert: &PriceAlert) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{alert}")
    }
}

/// Writes alerts, one per line, to an arbitrary writer.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> AlertSink for WriterSink<W> {
    fn notify(&mut self, alert: &PriceAlert) -> io::Result<()> {
        writeln!(self.writer, "{alert}")?;
        self.writer.flush()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
