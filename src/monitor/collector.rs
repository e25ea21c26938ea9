use std::error::Error;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::{MonitorConfig, RunMode};
use crate::platform::{Platform, TimerHandle, Visibility};

use super::vitals;
use super::{CombinedPayload, ErrorReport, PerformanceMetric, UserInteraction};

/// Latest point at which deferred setup must run after `initialize`.
const INIT_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

// ─── Collector ───────────────────────────────────────────────────

/// Batching telemetry collector.
///
/// Buffers error reports, performance metrics, and user interactions
/// in three independent queues and delivers them to the collection
/// service on a timer, on the error batch threshold, or through the
/// reliable one-shot path when the host is being hidden or torn down.
///
/// Every public operation is non-throwing and non-blocking; setup and
/// delivery failures are swallowed. Delivery is at-most-once — a queue
/// is cleared when it is snapshotted, not when delivery is confirmed,
/// and nothing is ever retried.
pub struct Monitor {
    config: MonitorConfig,
    platform: Arc<dyn Platform>,
    weak_self: Weak<Monitor>,
    inner: Mutex<Inner>,
    timer: Mutex<Option<TimerHandle>>,
}

#[derive(Default)]
struct Inner {
    errors: Vec<ErrorReport>,
    metrics: Vec<PerformanceMetric>,
    interactions: Vec<UserInteraction>,
    init_scheduled: bool,
    initialized: bool,
}

impl Monitor {
    pub fn new(config: MonitorConfig, platform: Arc<dyn Platform>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            config,
            platform,
            weak_self: weak.clone(),
            inner: Mutex::new(Inner::default()),
            timer: Mutex::new(None),
        })
    }

    // ── Initialization ──────────────────────────────────────────

    /// Schedule deferred setup: error hooks, performance tracking, and
    /// the automatic flush timer all attach once the host is idle,
    /// never synchronously inside this call. Idempotent — repeated
    /// calls, before or after setup completes, change nothing.
    pub fn initialize(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.init_scheduled {
                return;
            }
            inner.init_scheduled = true;
        }

        let weak = self.weak_self.clone();
        self.platform.schedule_idle(
            INIT_IDLE_TIMEOUT,
            Box::new(move || {
                if let Some(monitor) = weak.upgrade() {
                    monitor.finish_initialize();
                }
            }),
        );
    }

    /// Whether deferred setup has completed. Tracking calls before this
    /// point are dropped.
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    fn finish_initialize(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.initialized {
                return;
            }
            inner.initialized = true;
        }
        self.setup_error_tracking();
        vitals::setup_performance_tracking(Arc::clone(&self.platform), self.weak_self.clone());
        self.start_automatic_flush();
        self.debug(|| "initialized".to_string());
    }

    fn setup_error_tracking(&self) {
        let weak = self.weak_self.clone();
        self.platform.on_uncaught_error(Box::new(move |message, stack| {
            if let Some(monitor) = weak.upgrade() {
                monitor.report_error(message, stack);
            }
        }));

        let weak = self.weak_self.clone();
        self.platform.on_visibility_hidden(Box::new(move || {
            if let Some(monitor) = weak.upgrade() {
                monitor.flush_with_beacon();
            }
        }));

        let weak = self.weak_self.clone();
        self.platform.on_page_hide(Box::new(move || {
            if let Some(monitor) = weak.upgrade() {
                monitor.flush_with_beacon();
            }
        }));
    }

    // ── Tracking ────────────────────────────────────────────────

    /// Record an error. The stack is built from the `source()` chain.
    /// Flushes the error queue once it reaches the batch threshold.
    pub fn track_error(&self, error: &dyn Error) {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        let stack = if chain.is_empty() {
            None
        } else {
            Some(chain.join("\n"))
        };
        self.report_error(error.to_string(), stack);
    }

    /// Record an error from a bare message — the coercion path for
    /// failures that don't carry an `Error` value.
    pub fn track_error_message(&self, message: impl Into<String>) {
        self.report_error(message.into(), None);
    }

    fn report_error(&self, message: String, stack: Option<String>) {
        if !self.is_initialized() {
            return;
        }
        let report = ErrorReport {
            message,
            stack,
            url: self.platform.page_url(),
            timestamp: self.platform.now().to_rfc3339(),
            user_agent: self.platform.user_agent(),
        };
        self.debug(|| format!("error tracked: {report:?}"));

        let should_flush = {
            let mut inner = self.inner.lock();
            inner.errors.push(report);
            inner.errors.len() >= self.config.batch_size
        };
        if should_flush {
            self.flush_errors();
        }
    }

    /// Record a performance metric. Metrics batch on the timer and on
    /// teardown only, never eagerly — high-frequency sources must not
    /// produce per-event requests.
    pub fn track_metric(&self, name: impl Into<String>, value: f64) {
        if !self.is_initialized() {
            return;
        }
        let metric = PerformanceMetric {
            name: name.into(),
            value,
            url: self.platform.page_url(),
            timestamp: self.platform.now().to_rfc3339(),
        };
        self.debug(|| format!("metric tracked: {metric:?}"));
        self.inner.lock().metrics.push(metric);
    }

    /// Record a user interaction. Same batching policy as metrics.
    pub fn track_interaction(&self, kind: impl Into<String>, element: impl Into<String>) {
        if !self.is_initialized() {
            return;
        }
        let interaction = UserInteraction {
            kind: kind.into(),
            element: element.into(),
            url: self.platform.page_url(),
            timestamp: self.platform.now().to_rfc3339(),
        };
        self.debug(|| format!("interaction tracked: {interaction:?}"));
        self.inner.lock().interactions.push(interaction);
    }

    // ── Flushing ────────────────────────────────────────────────

    /// Deliver everything queued. Hidden hosts get the reliable
    /// one-shot path; visible hosts the standard per-queue submission.
    pub fn flush_all(&self) {
        if self.platform.visibility() == Visibility::Hidden {
            self.flush_with_beacon();
        } else {
            self.flush_errors();
            self.flush_metrics();
            self.flush_interactions();
        }
    }

    /// Cancel the automatic flush timer. Queued records stay queued;
    /// threshold and teardown flushes keep working.
    pub fn stop_automatic_flush(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.cancel();
        }
    }

    fn start_automatic_flush(&self) {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            return;
        }
        let weak = self.weak_self.clone();
        *timer = Some(self.platform.start_interval(
            self.config.flush_interval,
            Box::new(move || {
                if let Some(monitor) = weak.upgrade() {
                    // Periodic flushing only while visible; hidden
                    // hosts flush through the teardown hooks instead.
                    if monitor.platform.visibility() == Visibility::Visible {
                        monitor.flush_all();
                    }
                }
            }),
        ));
    }

    /// Merge all queues into one payload and hand it to the reliable
    /// delivery primitive. Falls back to the standard flush when the
    /// platform doesn't provide one.
    fn flush_with_beacon(&self) {
        if !self.platform.supports_reliable_send() {
            self.flush_errors();
            self.flush_metrics();
            self.flush_interactions();
            return;
        }

        let payload = {
            let mut inner = self.inner.lock();
            if inner.errors.is_empty()
                && inner.metrics.is_empty()
                && inner.interactions.is_empty()
            {
                return;
            }
            CombinedPayload {
                errors: std::mem::take(&mut inner.errors),
                metrics: std::mem::take(&mut inner.metrics),
                interactions: std::mem::take(&mut inner.interactions),
            }
        };

        let url = format!("{}/all", self.config.endpoint);
        self.debug(|| format!("reliable flush: {} record(s) -> {url}", payload.len()));
        if self.config.run_mode != RunMode::Production {
            self.debug(|| format!("delivery suppressed (non-production): {url}"));
            return;
        }
        if let Ok(body) = serde_json::to_vec(&payload) {
            self.platform.reliable_send(&url, body);
        }
    }

    fn flush_errors(&self) {
        let batch = std::mem::take(&mut self.inner.lock().errors);
        self.send_batch("/errors", &batch);
    }

    fn flush_metrics(&self) {
        let batch = std::mem::take(&mut self.inner.lock().metrics);
        self.send_batch("/metrics", &batch);
    }

    fn flush_interactions(&self) {
        let batch = std::mem::take(&mut self.inner.lock().interactions);
        self.send_batch("/interactions", &batch);
    }

    /// Standard fire-and-forget submission of one queue's snapshot.
    /// The queue was already cleared by the caller; a failed request
    /// loses the batch.
    fn send_batch<T: Serialize>(&self, path: &str, batch: &[T]) {
        if batch.is_empty() {
            return;
        }
        let url = format!("{}{}", self.config.endpoint, path);
        self.debug(|| format!("flush: {} record(s) -> {url}", batch.len()));
        if self.config.run_mode != RunMode::Production {
            self.debug(|| format!("delivery suppressed (non-production): {url}"));
            return;
        }
        if let Ok(body) = serde_json::to_vec(batch) {
            self.platform.post_json(&url, body);
        }
    }

    fn debug(&self, message: impl FnOnce() -> String) {
        if self.config.debug {
            log::debug!(target: "telemetry_beacon", "{}", message());
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────
