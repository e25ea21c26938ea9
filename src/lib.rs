//! Batching telemetry for host applications: errors, performance
//! metrics, and user interactions buffered in independent queues and
//! delivered to a collection backend on a timer, on a batch threshold,
//! or through a reliable one-shot send when the host is torn down.
//!
//! Tracking is strictly best-effort: nothing here throws, blocks, or
//! retries, and a batch lost to a network failure stays lost.
//!
//! Two ways to use it:
//!
//! - **Process-wide**: call [`init_monitoring`] once at startup, then
//!   [`track_page_view`] (or the tracking methods on [`global`]'s
//!   monitor) from anywhere.
//! - **Explicit instance**: build a [`Monitor`] with your own
//!   [`MonitorConfig`] and [`Platform`](platform::Platform); this is
//!   what embedding contexts and tests do.

pub mod config;
pub mod monitor;
pub mod platform;
pub mod simulator;
pub mod sink;

pub use config::{MonitorConfig, MonitorOptions, RunMode};
pub use monitor::{
    CombinedPayload, ErrorReport, Monitor, PerformanceMetric, UserInteraction,
};
pub use platform::{HostPlatform, NavigationTiming, Platform, Visibility};

use std::sync::{Arc, OnceLock};

static MONITOR: OnceLock<Arc<Monitor>> = OnceLock::new();

/// Set up the process-wide monitor.
///
/// The first call constructs the instance (config from the environment
/// overlaid with `options`, a default [`HostPlatform`]) and schedules
/// its deferred initialization; later calls are no-ops, so this is
/// safe to invoke from multiple entry points. Call it from inside the
/// tokio runtime — the platform captures the current runtime handle
/// for its timers and submissions.
pub fn init_monitoring(options: MonitorOptions) {
    let monitor = MONITOR.get_or_init(|| {
        let config = options.apply(MonitorConfig::from_env());
        let platform = HostPlatform::builder().build();
        Monitor::new(config, platform)
    });
    monitor.initialize();
}

/// Install a pre-built monitor as the process-wide instance instead of
/// letting [`init_monitoring`] construct one. Returns `false` if an
/// instance was already installed (the argument is dropped).
pub fn install(monitor: Arc<Monitor>) -> bool {
    MONITOR.set(monitor).is_ok()
}

/// The process-wide monitor, if one has been installed.
pub fn global() -> Option<Arc<Monitor>> {
    MONITOR.get().cloned()
}

/// Record a page view for `path` on the process-wide monitor.
/// A no-op until [`init_monitoring`] (or [`install`]) has run.
pub fn track_page_view(path: &str) {
    if let Some(monitor) = MONITOR.get() {
        monitor.track_interaction("pageView", path);
    }
}
