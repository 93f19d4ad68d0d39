//! Threshold-crossing detection.
//!
//! [`AlertEngine`] keeps one [`AlertState`] per symbol for the lifetime of the
//! engine and turns a stream of quote observations into edge-triggered
//! [`PriceAlert`]s: a boundary alerts when it flips from not-satisfied to
//! satisfied between two consecutive observations of the same symbol, and
//! stays quiet while it remains satisfied. The engine does not care how often
//! observations arrive, so polling cadence never produces duplicates.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::models::AssetQuote;
use crate::notifications::{AlertSink, Boundary, ConsoleSink, PriceAlert};

/// Last derived threshold state of one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    pub above_target: bool,
    pub below_target: bool,
}

impl AlertState {
    /// Derive the state of `quote` against its merged thresholds.
    pub fn derive(quote: &AssetQuote) -> Self {
        let price = quote.price();
        Self {
            above_target: quote.target_price_above.is_some_and(|t| price >= t),
            below_target: quote.target_price_below.is_some_and(|t| price <= t),
        }
    }
}

struct Inner {
    states: HashMap<String, AlertState>,
    sink: Box<dyn AlertSink>,
}

/// Per-symbol crossing detector with a swappable output sink.
///
/// State and sink sit behind one lock; a whole batch is evaluated under it,
/// so an initial snapshot racing a live update for the same symbol cannot
/// interleave. Share one engine per process (by reference or `Arc`).
pub struct AlertEngine {
    inner: Mutex<Inner>,
}

impl AlertEngine {
    /// Engine writing alerts to standard output.
    pub fn new() -> Self {
        Self::with_sink(Box::new(ConsoleSink))
    }

    pub fn with_sink(sink: Box<dyn AlertSink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                states: HashMap::new(),
                sink,
            }),
        }
    }

    /// Replace the output sink, returning the previous one.
    pub fn set_sink(&self, sink: Box<dyn AlertSink>) -> Box<dyn AlertSink> {
        std::mem::replace(&mut self.inner.lock().sink, sink)
    }

    /// Evaluate a batch of observations and emit alerts for rising edges.
    ///
    /// Quotes without any configured threshold are skipped and leave no state
    /// behind. Returns the alerts written to the sink, in batch order.
    pub fn process(&self, quotes: &[AssetQuote]) -> Vec<PriceAlert> {
        let mut inner = self.inner.lock();
        let Inner { states, sink } = &mut *inner;
        let mut emitted = Vec::new();

        for quote in quotes {
            if quote.targets().is_empty() {
                continue;
            }

            let next = AlertState::derive(quote);
            let previous = states.get(&quote.symbol).copied();
            // A symbol seen for the first time is compared against all-false.
            let baseline = previous.unwrap_or_default();
            let first_observation = previous.is_none();

            if let (true, false, Some(target)) =
                (next.above_target, baseline.above_target, quote.target_price_above)
            {
                emitted.push(PriceAlert {
                    symbol: quote.symbol.clone(),
                    boundary: Boundary::Above,
                    target,
                    price: quote.price(),
                    first_observation,
                });
            }
            if let (true, false, Some(target)) =
                (next.below_target, baseline.below_target, quote.target_price_below)
            {
                emitted.push(PriceAlert {
                    symbol: quote.symbol.clone(),
                    boundary: Boundary::Below,
                    target,
                    price: quote.price(),
                    first_observation,
                });
            }

            states.insert(quote.symbol.clone(), next);
        }

        for alert in &emitted {
            tracing::info!(
                symbol = %alert.symbol,
                boundary = %alert.boundary,
                target = alert.target,
                price = alert.price,
                "price alert"
            );
            if let Err(e) = sink.notify(alert) {
                tracing::warn!(error = %e, symbol = %alert.symbol, "failed to write price alert");
            }
        }

        emitted
    }

    /// Recorded state for `symbol`, if it has been evaluated.
    pub fn state(&self, symbol: &str) -> Option<AlertState> {
        self.inner.lock().states.get(symbol).copied()
    }

    /// Number of symbols with recorded state.
    pub fn tracked_symbols(&self) -> usize {
        self.inner.lock().states.len()
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertEngine")
            .field("tracked_symbols", &self.tracked_symbols())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuotePrice;
    use std::io::{self, Write};
    use std::sync::Arc;

    /// Writer that keeps everything in a shared buffer the test can inspect.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn take(&self) -> String {
            String::from_utf8(std::mem::take(&mut *self.0.lock())).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingSink;

    impl AlertSink for FailingSink {
        fn notify(&mut self, _alert: &PriceAlert) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    fn engine() -> (AlertEngine, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let engine =
            AlertEngine::with_sink(Box::new(crate::notifications::WriterSink::new(buffer.clone())));
        (engine, buffer)
    }

    fn observation(symbol: &str, price: f64, above: Option<f64>, below: Option<f64>) -> AssetQuote {
        AssetQuote {
            symbol: symbol.to_string(),
            quote_price: QuotePrice {
                price,
                ..Default::default()
            },
            target_price_above: above,
            target_price_below: below,
            ..Default::default()
        }
    }

    #[test]
    fn test_crossing_sequence_emits_only_on_rising_edges() {
        let (engine, buffer) = engine();
        let abc = |price| observation("ABC", price, Some(100.0), Some(80.0));

        assert!(engine.process(&[abc(90.0)]).is_empty());
        assert!(buffer.take().is_empty());

        let alerts = engine.process(&[abc(110.0)]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].boundary, Boundary::Above);
        assert!(buffer
            .take()
            .contains("ALERT: ABC crossed above target price of 100.00. Current price: 110.00"));

        assert!(engine.process(&[abc(120.0)]).is_empty());
        assert!(buffer.take().is_empty());

        let alerts = engine.process(&[abc(70.0)]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].boundary, Boundary::Below);
        let out = buffer.take();
        assert!(out.contains("ALERT: ABC crossed below target price of 80.00. Current price: 70.00"));

        assert!(engine.process(&[abc(60.0)]).is_empty());
        assert!(engine.process(&[abc(95.0)]).is_empty());
        assert!(buffer.take().is_empty());

        let alerts = engine.process(&[abc(103.0)]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].boundary, Boundary::Above);
        let out = buffer.take();
        assert!(out.contains("ABC crossed above"));
        assert!(out.contains("Current price: 103.00"));
    }

    #[test]
    fn test_first_observation_already_past_target_alerts() {
        let (engine, buffer) = engine();
        let alerts = engine.process(&[observation("XYZ", 60.0, Some(50.0), None)]);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].first_observation);
        assert_eq!(
            buffer.take().trim_end(),
            "ALERT: XYZ is above target price of 50.00. Current price: 60.00"
        );

        // Still above: no repeat.
        assert!(engine
            .process(&[observation("XYZ", 65.0, Some(50.0), None)])
            .is_empty());
    }

    #[test]
    fn test_symbol_without_targets_is_never_tracked() {
        let (engine, _) = engine();
        assert!(engine.process(&[observation("NOP", 10.0, None, None)]).is_empty());
        assert!(engine.state("NOP").is_none());
        assert_eq!(engine.tracked_symbols(), 0);
    }

    #[test]
    fn test_state_is_replaced_after_every_observation() {
        let (engine, _) = engine();
        engine.process(&[observation("ABC", 110.0, Some(100.0), Some(80.0))]);
        assert_eq!(
            engine.state("ABC"),
            Some(AlertState {
                above_target: true,
                below_target: false
            })
        );
        engine.process(&[observation("ABC", 90.0, Some(100.0), Some(80.0))]);
        assert_eq!(engine.state("ABC"), Some(AlertState::default()));
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let (engine, _) = engine();
        let alerts = engine.process(&[
            observation("UP", 100.0, Some(100.0), None),
            observation("DOWN", 80.0, None, Some(80.0)),
        ]);
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn test_symbols_are_tracked_independently() {
        let (engine, _) = engine();
        engine.process(&[
            observation("A", 90.0, Some(100.0), None),
            observation("B", 110.0, Some(100.0), None),
        ]);
        let alerts = engine.process(&[
            observation("A", 101.0, Some(100.0), None),
            observation("B", 111.0, Some(100.0), None),
        ]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].symbol, "A");
    }

    #[test]
    fn test_sink_failure_does_not_abort_evaluation() {
        let engine = AlertEngine::with_sink(Box::new(FailingSink));
        let alerts = engine.process(&[observation("ABC", 120.0, Some(100.0), None)]);
        assert_eq!(alerts.len(), 1);
        assert!(engine.state("ABC").unwrap().above_target);
    }

    #[test]
    fn test_set_sink_redirects_output() {
        let (engine, first) = engine();
        let second = SharedBuffer::default();
        engine.set_sink(Box::new(crate::notifications::WriterSink::new(second.clone())));

        engine.process(&[observation("ABC", 120.0, Some(100.0), None)]);
        assert!(first.take().is_empty());
        assert!(second.take().contains("ABC"));
    }

    #[test]
    fn test_concurrent_batches_emit_exactly_once() {
        let (engine, buffer) = engine();
        let engine = Arc::new(engine);
        engine.process(&[observation("ABC", 90.0, Some(100.0), None)]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    engine
                        .process(&[observation("ABC", 120.0, Some(100.0), None)])
                        .len()
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1);
        assert_eq!(buffer.take().lines().count(), 1);
    }
}
