//! [`Monitor`] backed by the simulated market.
//!
//! Equity symbols are served poll-style: every refresh interval the whole
//! equity bucket is ticked and delivered as one group snapshot. Crypto
//! symbols are served push-style: each symbol is ticked and delivered on its
//! own at a faster cadence. A halted symbol is skipped and reported as a
//! streaming error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use screen_core::error::ScreenError;
use screen_core::models::{AssetGroup, AssetGroupQuote, AssetQuote, QuoteSource};
use screen_data::market::SimulatedMarket;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::monitor::{ErrorReporter, Monitor, MonitorConfig, MonitorFactory, UpdateCallbacks};
use crate::version::VersionToken;

/// Lower bound on the push cadence.
const MIN_PUSH_INTERVAL: Duration = Duration::from_millis(200);

/// Push feeds run this many times faster than the poll cadence.
const PUSH_SPEEDUP: u32 = 5;

#[derive(Default)]
struct FeedState {
    running: bool,
    callbacks: Option<UpdateCallbacks>,
    armed: Option<(AssetGroup, VersionToken)>,
    cancel: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

impl FeedState {
    fn halt_feeds(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Random-walk monitor. Feeds only run between `start` and `stop` while a
/// group is armed and callbacks are registered.
pub struct SimulatedMonitor {
    market: Arc<SimulatedMarket>,
    refresh_interval: Duration,
    errors: ErrorReporter,
    state: Mutex<FeedState>,
}

impl SimulatedMonitor {
    pub fn new(market: Arc<SimulatedMarket>, config: MonitorConfig) -> Self {
        Self {
            market,
            refresh_interval: config.refresh_interval,
            errors: config.errors,
            state: Mutex::new(FeedState::default()),
        }
    }

    pub fn push_interval(&self) -> Duration {
        (self.refresh_interval / PUSH_SPEEDUP).max(MIN_PUSH_INTERVAL)
    }

    /// Replace any running feeds with ones matching the current state.
    fn respawn(&self, state: &mut FeedState) -> anyhow::Result<()> {
        state.halt_feeds();
        if !state.running {
            return Ok(());
        }
        let (Some(callbacks), Some((group, version))) = (&state.callbacks, &state.armed) else {
            return Ok(());
        };

        let runtime = tokio::runtime::Handle::try_current()
            .context("simulated monitor requires a tokio runtime")?;
        let cancel = CancellationToken::new();

        let equities = group.symbols_for(QuoteSource::Equity).to_vec();
        if !equities.is_empty() {
            let feed = PollFeed {
                market: Arc::clone(&self.market),
                errors: Arc::clone(&self.errors),
                callbacks: callbacks.clone(),
                group_name: group.name.clone(),
                symbols: equities,
                version: *version,
            };
            state
                .tasks
                .push(runtime.spawn(feed.run(self.refresh_interval, cancel.clone())));
        }

        let crypto = group.symbols_for(QuoteSource::Crypto).to_vec();
        if !crypto.is_empty() {
            let feed = PushFeed {
                market: Arc::clone(&self.market),
                errors: Arc::clone(&self.errors),
                callbacks: callbacks.clone(),
                symbols: crypto,
                version: *version,
            };
            state
                .tasks
                .push(runtime.spawn(feed.run(self.push_interval(), cancel.clone())));
        }

        tracing::debug!(
            group = %group.name,
            %version,
            feeds = state.tasks.len(),
            "simulated feeds started"
        );
        state.cancel = Some(cancel);
        Ok(())
    }
}

impl Monitor for SimulatedMonitor {
    fn start(&self) {
        let mut state = self.state.lock();
        if state.running {
            return;
        }
        state.running = true;
        if let Err(e) = self.respawn(&mut state) {
            tracing::warn!(error = %e, "simulated monitor could not start feeds");
            (self.errors)(ScreenError::Streaming(e.to_string()));
        }
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        if !state.running {
            return;
        }
        state.running = false;
        state.halt_feeds();
        tracing::debug!("simulated monitor stopped");
    }

    fn set_on_update(&self, callbacks: UpdateCallbacks) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.callbacks = Some(callbacks);
        self.respawn(&mut state)
    }

    fn set_asset_group(&self, group: AssetGroup, version: VersionToken) -> anyhow::Result<()> {
        if group.symbols.is_empty() {
            anyhow::bail!("asset group {} has no symbols", group.name);
        }
        let mut state = self.state.lock();
        state.armed = Some((group, version));
        self.respawn(&mut state)
    }

    fn asset_group_quote(&self) -> AssetGroupQuote {
        let state = self.state.lock();
        let Some((group, _)) = &state.armed else {
            return AssetGroupQuote::default();
        };
        let quotes = group
            .symbols_by_source
            .iter()
            .flat_map(|bucket| {
                bucket
                    .symbols
                    .iter()
                    .map(|symbol| tagged(self.market.quote(symbol), bucket.source))
            })
            .collect();
        AssetGroupQuote {
            name: group.name.clone(),
            quotes,
        }
    }
}

impl Drop for SimulatedMonitor {
    fn drop(&mut self) {
        self.state.get_mut().halt_feeds();
    }
}

/// Builds [`SimulatedMonitor`]s over one shared market.
#[derive(Clone)]
pub struct SimulatedMonitorFactory {
    market: Arc<SimulatedMarket>,
}

impl SimulatedMonitorFactory {
    pub fn new(market: Arc<SimulatedMarket>) -> Self {
        Self { market }
    }
}

impl MonitorFactory for SimulatedMonitorFactory {
    fn create(&self, config: MonitorConfig) -> anyhow::Result<Arc<dyn Monitor>> {
        let monitor: Arc<dyn Monitor> =
            Arc::new(SimulatedMonitor::new(Arc::clone(&self.market), config));
        Ok(monitor)
    }
}

// ── Feeds ─────────────────────────────────────────────────────────────────────

fn tagged(mut quote: AssetQuote, source: QuoteSource) -> AssetQuote {
    quote.source = source;
    quote
}

fn ticker(period: Duration) -> time::Interval {
    let period = period.max(MIN_PUSH_INTERVAL);
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn report_halt(errors: &ErrorReporter, err: anyhow::Error) {
    tracing::debug!(error = %err, "simulated tick failed");
    errors(ScreenError::Streaming(err.to_string()));
}

/// Whole-group snapshots of the equity bucket.
struct PollFeed {
    market: Arc<SimulatedMarket>,
    errors: ErrorReporter,
    callbacks: UpdateCallbacks,
    group_name: String,
    symbols: Vec<String>,
    version: VersionToken,
}

impl PollFeed {
    async fn run(self, period: Duration, cancel: CancellationToken) {
        let mut interval = ticker(period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let mut quotes = Vec::with_capacity(self.symbols.len());
            for symbol in &self.symbols {
                match self.market.try_tick(symbol) {
                    Ok(quote) => quotes.push(tagged(quote, QuoteSource::Equity)),
                    Err(e) => report_halt(&self.errors, e),
                }
            }
            if quotes.is_empty() {
                continue;
            }
            let snapshot = AssetGroupQuote {
                name: self.group_name.clone(),
                quotes,
            };
            (self.callbacks.on_group_update)(snapshot, self.version);
        }
    }
}

/// Per-symbol updates of the crypto bucket.
struct PushFeed {
    market: Arc<SimulatedMarket>,
    errors: ErrorReporter,
    callbacks: UpdateCallbacks,
    symbols: Vec<String>,
    version: VersionToken,
}

impl PushFeed {
    async fn run(self, period: Duration, cancel: CancellationToken) {
        let mut interval = ticker(period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            for symbol in &self.symbols {
                match self.market.try_tick(symbol) {
                    Ok(quote) => (self.callbacks.on_symbol_update)(
                        symbol,
                        tagged(quote, QuoteSource::Crypto),
                        self.version,
                    ),
                    Err(e) => report_halt(&self.errors, e),
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{partition, SuffixRouter};
    use tokio::sync::mpsc;

    // ── helpers ───────────────────────────────────────────────────────────

    enum Seen {
        Symbol(String, VersionToken),
        Group(Vec<String>, VersionToken),
        Error(String),
    }

    fn recording(
        refresh: Duration,
    ) -> (SimulatedMonitor, Arc<SimulatedMarket>, mpsc::UnboundedReceiver<Seen>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let market = Arc::new(SimulatedMarket::default());

        let err_tx = tx.clone();
        let config = MonitorConfig {
            refresh_interval: refresh,
            errors: Arc::new(move |e: ScreenError| {
                let _ = err_tx.send(Seen::Error(e.to_string()));
            }),
        };
        let monitor = SimulatedMonitor::new(Arc::clone(&market), config);

        let sym_tx = tx.clone();
        let callbacks = UpdateCallbacks {
            on_symbol_update: Arc::new(move |symbol: &str, _: AssetQuote, v: VersionToken| {
                let _ = sym_tx.send(Seen::Symbol(symbol.to_string(), v));
            }),
            on_group_update: Arc::new(move |group: AssetGroupQuote, v: VersionToken| {
                let symbols = group.quotes.into_iter().map(|q| q.symbol).collect();
                let _ = tx.send(Seen::Group(symbols, v));
            }),
        };
        monitor.set_on_update(callbacks).unwrap();
        (monitor, market, rx)
    }

    fn group(symbols: &[&str]) -> AssetGroup {
        let symbols: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
        partition("test", &symbols, &SuffixRouter)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Seen {
        time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("timed out waiting for feed")
            .expect("feed channel closed")
    }

    // ── tests ─────────────────────────────────────────────────────────────

    #[test]
    fn test_push_interval_is_faster_but_bounded() {
        let (tx, _rx) = mpsc::unbounded_channel::<ScreenError>();
        let config = |secs| MonitorConfig {
            refresh_interval: Duration::from_secs(secs),
            errors: {
                let tx = tx.clone();
                Arc::new(move |e: ScreenError| {
                    let _ = tx.send(e);
                })
            },
        };
        let market = Arc::new(SimulatedMarket::default());
        let slow = SimulatedMonitor::new(Arc::clone(&market), config(15));
        assert_eq!(slow.push_interval(), Duration::from_secs(3));
        let fast = SimulatedMonitor::new(market, config(0));
        assert_eq!(fast.push_interval(), MIN_PUSH_INTERVAL);
    }

    #[tokio::test]
    async fn test_equities_arrive_as_group_snapshots() {
        let (monitor, _market, mut rx) = recording(Duration::from_millis(50));
        let version = VersionToken::mint();
        monitor.start();
        monitor
            .set_asset_group(group(&["AAPL", "MSFT"]), version)
            .unwrap();

        match next(&mut rx).await {
            Seen::Group(symbols, v) => {
                assert_eq!(symbols, ["AAPL", "MSFT"]);
                assert_eq!(v, version);
            }
            _ => panic!("expected a group snapshot"),
        }
        monitor.stop();
    }

    #[tokio::test]
    async fn test_crypto_arrives_per_symbol() {
        let (monitor, _market, mut rx) = recording(Duration::from_millis(50));
        let version = VersionToken::mint();
        monitor.start();
        monitor.set_asset_group(group(&["BTC-USD"]), version).unwrap();

        match next(&mut rx).await {
            Seen::Symbol(symbol, v) => {
                assert_eq!(symbol, "BTC-USD");
                assert_eq!(v, version);
            }
            _ => panic!("expected a symbol update"),
        }
        monitor.stop();
    }

    #[tokio::test]
    async fn test_halted_symbol_is_reported() {
        let (monitor, market, mut rx) = recording(Duration::from_millis(50));
        market.halt("AAPL");
        monitor.start();
        monitor
            .set_asset_group(group(&["AAPL"]), VersionToken::mint())
            .unwrap();

        match next(&mut rx).await {
            Seen::Error(message) => assert!(message.contains("trading halted for AAPL")),
            _ => panic!("expected a streaming error"),
        }
        monitor.stop();
    }

    #[tokio::test]
    async fn test_rearming_switches_version() {
        let (monitor, _market, mut rx) = recording(Duration::from_millis(50));
        monitor.start();
        monitor
            .set_asset_group(group(&["AAPL"]), VersionToken::mint())
            .unwrap();
        let second = VersionToken::mint();
        monitor.set_asset_group(group(&["MSFT"]), second).unwrap();

        match next(&mut rx).await {
            Seen::Group(symbols, v) => {
                assert_eq!(symbols, ["MSFT"]);
                assert_eq!(v, second);
            }
            _ => panic!("expected a group snapshot"),
        }
        monitor.stop();
    }

    #[tokio::test]
    async fn test_stop_halts_feeds_and_is_idempotent() {
        let (monitor, _market, mut rx) = recording(Duration::from_millis(50));
        monitor.start();
        monitor
            .set_asset_group(group(&["AAPL", "ETH-USD"]), VersionToken::mint())
            .unwrap();
        monitor.stop();
        monitor.stop();

        while rx.try_recv().is_ok() {}
        time::sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_snapshot_covers_armed_group() {
        let (monitor, market, _rx) = recording(Duration::from_secs(60));
        assert!(monitor.asset_group_quote().quotes.is_empty());

        monitor
            .set_asset_group(group(&["AAPL", "BTC-USD"]), VersionToken::mint())
            .unwrap();
        market.set_price("AAPL", 123.0);

        let snapshot = monitor.asset_group_quote();
        assert_eq!(snapshot.name, "test");
        assert_eq!(snapshot.quotes.len(), 2);
        assert_eq!(snapshot.quotes[0].price(), 123.0);
        assert_eq!(snapshot.quotes[1].source, QuoteSource::Crypto);
    }

    #[tokio::test]
    async fn test_empty_group_is_rejected() {
        let (monitor, _market, _rx) = recording(Duration::from_secs(60));
        let err = monitor
            .set_asset_group(AssetGroup::default(), VersionToken::mint())
            .unwrap_err();
        assert!(err.to_string().contains("no symbols"));
    }

    #[test]
    fn test_arming_outside_runtime_fails_once_started() {
        let (monitor, _market, _rx) = recording(Duration::from_secs(60));
        monitor.start();
        let err = monitor
            .set_asset_group(group(&["AAPL"]), VersionToken::mint())
            .unwrap_err();
        assert!(err.to_string().contains("tokio runtime"));
    }
}
