//! Live screening orchestrator.
//!
//! [`LiveScreener::run`] screens a universe once, arms a [`Monitor`] with the
//! survivors and relays its callbacks onto two bounded channels (updates and
//! errors) so the caller's event loop can consume them without sharing any
//! mutable state with the monitor's tasks.
//!
//! Every update passes through the same gate before it is queued: its version
//! token must match the one minted for this run and the run must not be
//! shutting down. Surviving updates get the screener's target prices (and,
//! for a single-symbol screen, the ad-hoc override) merged on, then are
//! offered without ever waiting for room.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use screen_core::error::{Result, ScreenError};
use screen_core::filter::AllOf;
use screen_core::models::{AssetGroupQuote, AssetQuote, TargetPrices};
use screen_core::universe::UniverseId;
use screen_data::screener::Screener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::monitor::{ErrorReporter, Monitor, MonitorConfig, MonitorFactory, UpdateCallbacks};
use crate::queue::{self, BoundedSender, DropCounter, Offer};
use crate::routing::{partition, SourceRouter, SuffixRouter};
use crate::version::{Update, VersionToken};

/// Name of the asset group armed on the monitor.
pub const LIVE_GROUP_NAME: &str = "live-screen";

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_UPDATE_CAPACITY: usize = 256;
pub const DEFAULT_ERROR_CAPACITY: usize = 16;

// ── Public types ──────────────────────────────────────────────────────────────

/// Tuning knobs for a live run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveOptions {
    /// Poll cadence handed to the monitor. Zero selects the default.
    pub refresh_interval: Duration,
    /// Capacity of the updates queue.
    pub update_capacity: usize,
    /// Capacity of the errors queue.
    pub error_capacity: usize,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            update_capacity: DEFAULT_UPDATE_CAPACITY,
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }
}

impl LiveOptions {
    pub fn effective_refresh_interval(&self) -> Duration {
        if self.refresh_interval.is_zero() {
            DEFAULT_REFRESH_INTERVAL
        } else {
            self.refresh_interval
        }
    }
}

/// What to screen and watch.
#[derive(Debug)]
pub struct LiveConfig {
    pub universe: UniverseId,
    pub filters: AllOf,
    /// Thresholds applied on top of the universe's when exactly one symbol
    /// survives the screen.
    pub ad_hoc: TargetPrices,
}

impl LiveConfig {
    /// Watch every symbol of `universe`, no filters, no ad-hoc targets.
    pub fn new(universe: UniverseId) -> Self {
        Self {
            universe,
            filters: AllOf::default(),
            ad_hoc: TargetPrices::NONE,
        }
    }
}

/// Output of a live run.
///
/// The caller must drain `updates` and `errors` promptly and eventually call
/// `stop` (or cancel the token passed to [`LiveScreener::run`]). A caller that
/// stops draining loses updates, it never stalls the monitor.
#[derive(Debug)]
pub struct LiveResult {
    /// Authoritative snapshot taken right after arming, targets merged.
    pub initial: Vec<AssetQuote>,
    pub updates: mpsc::Receiver<Update>,
    pub errors: mpsc::Receiver<ScreenError>,
    pub stop: StopHandle,
    /// Number of updates discarded because `updates` was full.
    pub dropped: DropCounter,
}

impl LiveResult {
    /// Result of a screen that matched nothing: no snapshot, both channels
    /// already closed and a stop handle that does nothing.
    pub fn empty() -> Self {
        Self {
            initial: Vec::new(),
            updates: queue::closed(),
            errors: queue::closed(),
            stop: StopHandle::noop(),
            dropped: DropCounter::default(),
        }
    }
}

/// Idempotent, non-blocking shutdown of a live run. Cheap to clone.
#[derive(Clone, Default)]
pub struct StopHandle {
    inner: Option<Arc<Teardown>>,
}

impl StopHandle {
    fn noop() -> Self {
        Self { inner: None }
    }

    /// Stop the run. Only the first call from any clone has an effect.
    pub fn stop(&self) {
        if let Some(teardown) = &self.inner {
            teardown.run();
        }
    }

    pub fn is_stopped(&self) -> bool {
        match &self.inner {
            Some(teardown) => teardown.fired.load(Ordering::Acquire),
            None => true,
        }
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

// ── LiveScreener ──────────────────────────────────────────────────────────────

/// Screens once, then keeps the matching symbols under live watch.
#[derive(Clone)]
pub struct LiveScreener {
    screener: Screener,
    factory: Arc<dyn MonitorFactory>,
    router: Arc<dyn SourceRouter>,
    options: LiveOptions,
}

impl LiveScreener {
    pub fn new(screener: Screener, factory: Arc<dyn MonitorFactory>) -> Self {
        Self {
            screener,
            factory,
            router: Arc::new(SuffixRouter),
            options: LiveOptions::default(),
        }
    }

    /// Replace the policy that assigns symbols to quote sources.
    pub fn with_router(mut self, router: Arc<dyn SourceRouter>) -> Self {
        self.router = router;
        self
    }

    pub fn with_options(mut self, options: LiveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LiveOptions {
        &self.options
    }

    /// Screen `config.universe` and start watching the survivors.
    ///
    /// Cancelling `ctx` while the screen is still fetching abandons the fetch
    /// and yields [`ScreenError::Cancelled`]; once armed, it tears the run
    /// down exactly as [`StopHandle::stop`] does. A failing screen is
    /// returned as-is; a monitor that cannot be created, configured or armed
    /// yields [`ScreenError::MonitorSetup`] after the monitor has been
    /// stopped.
    pub async fn run(&self, ctx: CancellationToken, config: LiveConfig) -> Result<LiveResult> {
        let screened = tokio::select! {
            screened = self.screener.run(&config.universe, &config.filters) => screened?,
            _ = ctx.cancelled() => {
                tracing::info!(universe = %config.universe, "live run cancelled during screen");
                return Err(ScreenError::Cancelled);
            }
        };
        if screened.is_empty() {
            tracing::info!(universe = %config.universe, "screen matched nothing; live run skipped");
            return Ok(LiveResult::empty());
        }

        let symbols: Vec<String> = screened.iter().map(|q| q.symbol.clone()).collect();
        let group = partition(LIVE_GROUP_NAME, &symbols, self.router.as_ref());
        let targets: HashMap<String, TargetPrices> = screened
            .iter()
            .map(|q| (q.symbol.clone(), q.targets()))
            .collect();
        let ad_hoc = if symbols.len() == 1 {
            config.ad_hoc
        } else {
            TargetPrices::NONE
        };

        let version = VersionToken::mint();
        let shutdown = CancellationToken::new();
        let (updates_tx, updates_rx) = queue::bounded(self.options.update_capacity);
        let (errors_tx, errors_rx) = queue::bounded(self.options.error_capacity);
        let dropped = updates_tx.drop_counter();

        let relay = Arc::new(Relay {
            version,
            shutdown: shutdown.clone(),
            updates: RwLock::new(Some(updates_tx)),
            errors: RwLock::new(Some(errors_tx)),
            targets,
            ad_hoc,
        });

        let reporter: ErrorReporter = {
            let relay = Arc::clone(&relay);
            Arc::new(move |err: ScreenError| relay.report(err))
        };
        let monitor = self
            .factory
            .create(MonitorConfig {
                refresh_interval: self.options.effective_refresh_interval(),
                errors: reporter,
            })
            .map_err(|e| ScreenError::monitor_setup("create", e))?;

        let teardown = Arc::new(Teardown {
            fired: AtomicBool::new(false),
            shutdown: shutdown.clone(),
            monitor: Arc::clone(&monitor),
            relay: Arc::clone(&relay),
        });

        if let Err(e) = monitor.set_on_update(relay.callbacks()) {
            teardown.run();
            return Err(ScreenError::monitor_setup("configure", e));
        }
        monitor.start();
        if let Err(e) = monitor.set_asset_group(group, version) {
            teardown.run();
            return Err(ScreenError::monitor_setup("arm", e));
        }

        {
            let teardown = Arc::clone(&teardown);
            tokio::spawn(async move {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::debug!("caller cancelled live run");
                        teardown.run();
                    }
                    _ = shutdown.cancelled() => {}
                }
            });
        }

        let initial: Vec<AssetQuote> = monitor
            .asset_group_quote()
            .quotes
            .into_iter()
            .map(|q| relay.merge(q))
            .collect();

        tracing::info!(
            universe = %config.universe,
            symbols = symbols.len(),
            %version,
            "live run armed"
        );

        Ok(LiveResult {
            initial,
            updates: updates_rx,
            errors: errors_rx,
            stop: StopHandle {
                inner: Some(teardown),
            },
            dropped,
        })
    }
}

// ── Private implementation ────────────────────────────────────────────────────

/// Shared state behind the monitor callbacks.
///
/// Senders live behind a lock so teardown can drop them, which closes both
/// channels for the consumer even while the monitor still holds callbacks.
struct Relay {
    version: VersionToken,
    shutdown: CancellationToken,
    updates: RwLock<Option<BoundedSender<Update>>>,
    errors: RwLock<Option<BoundedSender<ScreenError>>>,
    targets: HashMap<String, TargetPrices>,
    ad_hoc: TargetPrices,
}

impl Relay {
    fn callbacks(self: &Arc<Self>) -> UpdateCallbacks {
        let on_symbol = Arc::clone(self);
        let on_group = Arc::clone(self);
        UpdateCallbacks {
            on_symbol_update: Arc::new(
                move |symbol: &str, quote: AssetQuote, version: VersionToken| {
                    on_symbol.relay_symbol(symbol, quote, version)
                },
            ),
            on_group_update: Arc::new(move |group: AssetGroupQuote, version: VersionToken| {
                on_group.relay_group(group, version)
            }),
        }
    }

    fn relay_symbol(&self, symbol: &str, quote: AssetQuote, version: VersionToken) {
        if !self.admits(version) {
            return;
        }
        tracing::trace!(symbol, price = quote.price(), "symbol update");
        self.deliver(Update {
            quote: self.merge(quote),
            version,
        });
    }

    fn relay_group(&self, group: AssetGroupQuote, version: VersionToken) {
        if !self.admits(version) {
            return;
        }
        tracing::trace!(group = %group.name, quotes = group.quotes.len(), "group update");
        for quote in group.quotes {
            self.deliver(Update {
                quote: self.merge(quote),
                version,
            });
        }
    }

    /// Version gate first, then the shutdown gate.
    fn admits(&self, version: VersionToken) -> bool {
        if version != self.version {
            tracing::debug!(current = %self.version, stale = %version, "discarding stale update");
            return false;
        }
        if self.shutdown.is_cancelled() {
            tracing::trace!("discarding update after shutdown");
            return false;
        }
        true
    }

    /// Screener targets win over whatever the monitor carried; the ad-hoc
    /// override goes on top.
    fn merge(&self, mut quote: AssetQuote) -> AssetQuote {
        if let Some(targets) = self.targets.get(&quote.symbol) {
            quote.set_targets(*targets);
        }
        if !self.ad_hoc.is_empty() {
            quote.override_targets(self.ad_hoc);
        }
        quote
    }

    fn deliver(&self, update: Update) {
        let guard = self.updates.read();
        let Some(tx) = guard.as_ref() else {
            tracing::trace!("updates closed; discarding update");
            return;
        };
        match tx.offer(update) {
            Offer::Delivered => {}
            Offer::Dropped { total } => {
                tracing::debug!(total, "updates full; dropping update");
            }
            Offer::Closed => tracing::trace!("updates receiver gone; discarding update"),
        }
    }

    fn report(&self, err: ScreenError) {
        if self.shutdown.is_cancelled() {
            tracing::trace!(error = %err, "discarding monitor error after shutdown");
            return;
        }
        let guard = self.errors.read();
        let Some(tx) = guard.as_ref() else {
            return;
        };
        match tx.offer(err) {
            Offer::Delivered => {}
            Offer::Dropped { total } => tracing::debug!(total, "errors full; dropping error"),
            Offer::Closed => tracing::trace!("errors receiver gone; discarding error"),
        }
    }

    fn close(&self) {
        self.updates.write().take();
        self.errors.write().take();
    }
}

struct Teardown {
    fired: AtomicBool,
    shutdown: CancellationToken,
    monitor: Arc<dyn Monitor>,
    relay: Arc<Relay>,
}

impl Teardown {
    /// Shutdown signal, then monitor, then channels. Runs once.
    fn run(&self) {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.shutdown.cancel();
        self.monitor.stop();
        self.relay.close();
        tracing::info!(version = %self.relay.version, "live run stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
