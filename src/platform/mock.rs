//! Scripted [`Platform`] for unit tests.
//!
//! Nothing runs on its own: scheduled tasks queue up until the test
//! calls [`run_pending`](MockPlatform::run_pending), interval ticks
//! fire only through [`fire_ticks`](MockPlatform::fire_ticks), and
//! lifecycle hooks fire through the `emit_*` methods. Deliveries are
//! recorded instead of sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use super::{
    ErrorHook, Hook, NavigationTiming, Platform, Task, TimerHandle, Visibility, VitalKind,
    VitalSink, VitalsProbe,
};

pub(crate) struct MockPlatform {
    now: DateTime<Utc>,
    page_url: String,
    user_agent: String,
    visibility: Mutex<Visibility>,
    reliable: AtomicBool,
    drop_deliveries: AtomicBool,

    pending: Mutex<Vec<Task>>,
    intervals: Mutex<Vec<IntervalEntry>>,

    error_hooks: Mutex<Vec<ErrorHook>>,
    hidden_hooks: Mutex<Vec<Hook>>,
    pagehide_hooks: Mutex<Vec<Hook>>,
    load_hooks: Mutex<Vec<Hook>>,

    posts: Mutex<Vec<(String, Vec<u8>)>>,
    beacons: Mutex<Vec<(String, Vec<u8>)>>,

    vitals: Mutex<Option<Arc<dyn VitalsProbe>>>,
    nav_timing: Mutex<Option<NavigationTiming>>,
}

struct IntervalEntry {
    tick: Hook,
    cancelled: Arc<AtomicBool>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            page_url: "https://example.test/landing".into(),
            user_agent: "mock-agent/1.0".into(),
            visibility: Mutex::new(Visibility::Visible),
            reliable: AtomicBool::new(true),
            drop_deliveries: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
            intervals: Mutex::new(Vec::new()),
            error_hooks: Mutex::new(Vec::new()),
            hidden_hooks: Mutex::new(Vec::new()),
            pagehide_hooks: Mutex::new(Vec::new()),
            load_hooks: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            beacons: Mutex::new(Vec::new()),
            vitals: Mutex::new(None),
            nav_timing: Mutex::new(None),
        })
    }

    // ── Test controls ───────────────────────────────────────────

    /// Run every queued one-shot task, including tasks scheduled by the
    /// tasks themselves, until the queue is drained.
    pub fn run_pending(&self) {
        loop {
            let batch: Vec<Task> = std::mem::take(&mut *self.pending.lock());
            if batch.is_empty() {
                return;
            }
            for task in batch {
                task();
            }
        }
    }

    /// Fire one tick on every live interval.
    pub fn fire_ticks(&self) {
        let intervals = self.intervals.lock();
        for entry in intervals.iter() {
            if !entry.cancelled.load(Ordering::SeqCst) {
                (entry.tick)();
            }
        }
    }

    pub fn active_intervals(&self) -> usize {
        self.intervals
            .lock()
            .iter()
            .filter(|e| !e.cancelled.load(Ordering::SeqCst))
            .count()
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        *self.visibility.lock() = visibility;
    }

    pub fn set_reliable(&self, available: bool) {
        self.reliable.store(available, Ordering::SeqCst);
    }

    /// Simulate transport failure: deliveries are accepted and then
    /// thrown away without being recorded.
    pub fn drop_deliveries(&self, drop: bool) {
        self.drop_deliveries.store(drop, Ordering::SeqCst);
    }

    pub fn set_vitals_probe(&self, probe: Arc<dyn VitalsProbe>) {
        *self.vitals.lock() = Some(probe);
    }

    pub fn set_navigation_timing(&self, timing: NavigationTiming) {
        *self.nav_timing.lock() = Some(timing);
    }

    pub fn emit_error(&self, message: &str, stack: Option<&str>) {
        for hook in self.error_hooks.lock().iter() {
            hook(message.to_string(), stack.map(str::to_string));
        }
    }

    pub fn emit_visibility_hidden(&self) {
        *self.visibility.lock() = Visibility::Hidden;
        for hook in self.hidden_hooks.lock().iter() {
            hook();
        }
    }

    pub fn emit_page_hide(&self) {
        for hook in self.pagehide_hooks.lock().iter() {
            hook();
        }
    }

    pub fn emit_load(&self) {
        for hook in self.load_hooks.lock().iter() {
            hook();
        }
    }

    // ── Inspection ──────────────────────────────────────────────

    pub fn posts(&self) -> Vec<(String, Vec<u8>)> {
        self.posts.lock().clone()
    }

    pub fn beacons(&self) -> Vec<(String, Vec<u8>)> {
        self.beacons.lock().clone()
    }

    pub fn error_hook_count(&self) -> usize {
        self.error_hooks.lock().len()
    }

    pub fn hidden_hook_count(&self) -> usize {
        self.hidden_hooks.lock().len()
    }

    pub fn page_url_value(&self) -> &str {
        &self.page_url
    }
}

impl Platform for MockPlatform {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn page_url(&self) -> String {
        self.page_url.clone()
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn visibility(&self) -> Visibility {
        *self.visibility.lock()
    }

    fn schedule_idle(&self, _max_delay: Duration, task: Task) {
        self.pending.lock().push(task);
    }

    fn schedule_after(&self, _delay: Duration, task: Task) {
        self.pending.lock().push(task);
    }

    fn start_interval(&self, _period: Duration, tick: Hook) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.intervals.lock().push(IntervalEntry {
            tick,
            cancelled: Arc::clone(&cancelled),
        });
        TimerHandle::new(move || cancelled.store(true, Ordering::SeqCst))
    }

    fn on_uncaught_error(&self, hook: ErrorHook) {
        self.error_hooks.lock().push(hook);
    }

    fn on_visibility_hidden(&self, hook: Hook) {
        self.hidden_hooks.lock().push(hook);
    }

    fn on_page_hide(&self, hook: Hook) {
        self.pagehide_hooks.lock().push(hook);
    }

    fn on_load(&self, hook: Hook) {
        self.load_hooks.lock().push(hook);
    }

    fn post_json(&self, url: &str, body: Vec<u8>) {
        if self.drop_deliveries.load(Ordering::SeqCst) {
            return;
        }
        self.posts.lock().push((url.to_string(), body));
    }

    fn supports_reliable_send(&self) -> bool {
        self.reliable.load(Ordering::SeqCst)
    }

    fn reliable_send(&self, url: &str, body: Vec<u8>) {
        if self.drop_deliveries.load(Ordering::SeqCst) {
            return;
        }
        self.beacons.lock().push((url.to_string(), body));
    }

    fn vitals_probe(&self) -> Option<Arc<dyn VitalsProbe>> {
        self.vitals.lock().clone()
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        *self.nav_timing.lock()
    }
}

/// Probe that answers a fixed subset of vitals synchronously.
pub(crate) struct FixedVitals {
    values: Vec<(VitalKind, f64)>,
}

impl FixedVitals {
    pub fn new(values: Vec<(VitalKind, f64)>) -> Arc<Self> {
        Arc::new(Self { values })
    }
}

impl VitalsProbe for FixedVitals {
    fn observe(&self, kind: VitalKind, sink: VitalSink) {
        if let Some((_, value)) = self.values.iter().find(|(k, _)| *k == kind) {
            sink(*value);
        }
    }
}
