//! Live quote monitoring capability.
//!
//! A [`Monitor`] meters one named [`AssetGroup`] at a time, invoking the
//! registered [`UpdateCallbacks`] as quotes change. Every callback carries
//! the [`VersionToken`] that was active when the group was armed, letting
//! the consumer discard output from a superseded configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use screen_core::error::ScreenError;
use screen_core::models::{AssetGroup, AssetGroupQuote, AssetQuote};

use crate::version::VersionToken;

/// Callback for a single-symbol update (push-style sources).
pub type SymbolUpdateFn = Arc<dyn Fn(&str, AssetQuote, VersionToken) + Send + Sync>;

/// Callback for a whole-group snapshot (poll-style sources).
pub type GroupUpdateFn = Arc<dyn Fn(AssetGroupQuote, VersionToken) + Send + Sync>;

/// Sink for asynchronous, non-fatal monitor failures.
pub type ErrorReporter = Arc<dyn Fn(ScreenError) + Send + Sync>;

/// The pair of callbacks a monitor drives.
#[derive(Clone)]
pub struct UpdateCallbacks {
    pub on_symbol_update: SymbolUpdateFn,
    pub on_group_update: GroupUpdateFn,
}

impl UpdateCallbacks {
    /// Callbacks that ignore everything.
    pub fn noop() -> Self {
        Self {
            on_symbol_update: Arc::new(|_: &str, _: AssetQuote, _: VersionToken| {}),
            on_group_update: Arc::new(|_: AssetGroupQuote, _: VersionToken| {}),
        }
    }
}

impl fmt::Debug for UpdateCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateCallbacks").finish_non_exhaustive()
    }
}

/// Construction parameters handed to a [`MonitorFactory`].
#[derive(Clone)]
pub struct MonitorConfig {
    /// Cadence of poll-style refreshes.
    pub refresh_interval: Duration,
    /// Where asynchronous failures are reported.
    pub errors: ErrorReporter,
}

impl fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("refresh_interval", &self.refresh_interval)
            .finish_non_exhaustive()
    }
}

/// Multi-source quote monitor.
///
/// Methods take `&self` so one instance can be shared between the
/// orchestrator and its teardown path. `start` and `stop` must be safe to
/// call when idle, and `stop` must be safe to call more than once.
pub trait Monitor: Send + Sync {
    fn start(&self);

    fn stop(&self);

    /// Register the update callbacks. May be called before
    /// [`set_asset_group`](Monitor::set_asset_group).
    fn set_on_update(&self, callbacks: UpdateCallbacks) -> anyhow::Result<()>;

    /// Arm monitoring of `group`; every callback fired for it carries
    /// `version`. Failure is fatal for the caller.
    fn set_asset_group(&self, group: AssetGroup, version: VersionToken) -> anyhow::Result<()>;

    /// Authoritative snapshot of the currently armed group.
    fn asset_group_quote(&self) -> AssetGroupQuote;
}

/// Builds monitors; lets the orchestrator own construction.
pub trait MonitorFactory: Send + Sync {
    fn create(&self, config: MonitorConfig) -> anyhow::Result<Arc<dyn Monitor>>;
}

impl<F> MonitorFactory for F
where
    F: Fn(MonitorConfig) -> anyhow::Result<Arc<dyn Monitor>> + Send + Sync,
{
    fn create(&self, config: MonitorConfig) -> anyhow::Result<Arc<dyn Monitor>> {
        self(config)
    }
}
