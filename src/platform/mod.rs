//! Host-environment adapter.
//!
//! Everything the collector needs from its surroundings — wall clock,
//! page identity, visibility, deferred scheduling, lifecycle signals,
//! and the two delivery primitives — sits behind [`Platform`]. The
//! collector itself never touches a runtime global, which keeps it
//! portable and testable with a scripted stand-in.

pub mod host;
#[cfg(test)]
pub(crate) mod mock;

pub use host::{HostPlatform, HostPlatformBuilder};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

// ─── Callback shapes ─────────────────────────────────────────────

/// One-shot deferred work.
pub type Task = Box<dyn FnOnce() + Send>;

/// Re-entrant lifecycle callback.
pub type Hook = Box<dyn Fn() + Send + Sync>;

/// Uncaught-error callback: `(message, stack)`.
pub type ErrorHook = Box<dyn Fn(String, Option<String>) + Send + Sync>;

/// Receives the value of an observed vital once it is known.
pub type VitalSink = Box<dyn Fn(f64) + Send + Sync>;

// ─── Host state types ────────────────────────────────────────────

/// Whether the host surface is currently presented to a user.
/// `Hidden` means teardown may happen at any moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Web-vitals-style quality signals the host may be able to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VitalKind {
    /// Cumulative layout shift (unitless score).
    Cls,
    /// Largest contentful paint (ms).
    Lcp,
    /// First input delay (ms).
    Fid,
    /// First contentful paint (ms).
    Fcp,
    /// Time to first byte (ms).
    Ttfb,
}

impl VitalKind {
    /// Metric name used on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cls => "CLS",
            Self::Lcp => "LCP",
            Self::Fid => "FID",
            Self::Fcp => "FCP",
            Self::Ttfb => "TTFB",
        }
    }
}

/// Coarse navigation-timing breakdown of the initial load.
#[derive(Debug, Clone, Copy)]
pub struct NavigationTiming {
    /// Time to first byte (ms).
    pub ttfb_ms: f64,
    /// Start of navigation until DOM-content-loaded completed (ms).
    pub dom_content_loaded_ms: f64,
    /// Start of navigation until the load event completed (ms).
    pub load_complete_ms: f64,
}

/// Optional capability: asynchronous vital observation.
///
/// `observe` registers interest in a single vital; the sink is invoked
/// when (and only if) the host produces a value for it.
pub trait VitalsProbe: Send + Sync {
    fn observe(&self, kind: VitalKind, sink: VitalSink);
}

// ─── Timer handle ────────────────────────────────────────────────

/// Cancellation token for a repeating timer started through
/// [`Platform::start_interval`]. Dropping the handle without calling
/// [`cancel`](TimerHandle::cancel) leaves the timer running.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle for a timer that never started (e.g. no runtime present).
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

// ─── The adapter itself ──────────────────────────────────────────

/// Host-environment surface the collector runs against.
///
/// Implementations must be cheap to call: every method is invoked on
/// the tracking hot path or from lifecycle callbacks, and none may
/// block or panic.
pub trait Platform: Send + Sync + 'static {
    // ── Identity & state ────────────────────────────────────────
    fn now(&self) -> DateTime<Utc>;
    fn page_url(&self) -> String;
    fn user_agent(&self) -> String;
    fn visibility(&self) -> Visibility;

    // ── Scheduling ──────────────────────────────────────────────
    /// Run `task` when the host is idle, at the latest after
    /// `max_delay`. Never runs `task` synchronously inside the call.
    fn schedule_idle(&self, max_delay: Duration, task: Task);

    /// Run `task` once after `delay`.
    fn schedule_after(&self, delay: Duration, task: Task);

    /// Start a repeating timer. `tick` runs every `period` until the
    /// returned handle is cancelled.
    fn start_interval(&self, period: Duration, tick: Hook) -> TimerHandle;

    // ── Lifecycle hooks ─────────────────────────────────────────
    fn on_uncaught_error(&self, hook: ErrorHook);
    fn on_visibility_hidden(&self, hook: Hook);
    fn on_page_hide(&self, hook: Hook);
    fn on_load(&self, hook: Hook);

    // ── Delivery ────────────────────────────────────────────────
    /// Fire-and-forget JSON POST. Failures are invisible to the caller.
    fn post_json(&self, url: &str, body: Vec<u8>);

    /// Whether [`reliable_send`](Platform::reliable_send) is usable.
    fn supports_reliable_send(&self) -> bool {
        false
    }

    /// One-shot delivery that survives host teardown. The outcome is
    /// not observable; callers must treat it as best-effort.
    fn reliable_send(&self, url: &str, body: Vec<u8>);

    // ── Optional capabilities ───────────────────────────────────
    fn vitals_probe(&self) -> Option<Arc<dyn VitalsProbe>> {
        None
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        None
    }
}
