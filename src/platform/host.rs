//! Production [`Platform`] backed by tokio and reqwest.
//!
//! Lifecycle mapping for a headless host process:
//!   - uncaught errors   ← the process panic hook
//!   - page hide         ← Ctrl-C / termination signal, or an explicit
//!                         [`begin_teardown`](HostPlatform::begin_teardown)
//!   - visibility        ← flips to `Hidden` when teardown starts
//!   - load              ← the process is considered loaded as soon as
//!                         the platform exists; `on_load` hooks run
//!                         asynchronously right away
//!
//! The reliable send runs a blocking HTTP POST on a detached OS thread,
//! so a batch handed to it is still delivered while the async runtime
//! is shutting down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;

use super::{
    ErrorHook, Hook, NavigationTiming, Platform, Task, TimerHandle, Visibility, VitalsProbe,
};

/// Upper bound on the detached reliable-send request.
const BEACON_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for fire-and-forget submissions.
const POST_TIMEOUT: Duration = Duration::from_secs(10);

// ─── Platform ────────────────────────────────────────────────────

pub struct HostPlatform {
    page_url: String,
    user_agent: String,
    hidden: Arc<AtomicBool>,
    runtime: Option<Handle>,
    client: Option<reqwest::Client>,
    reliable: bool,
    vitals: Option<Arc<dyn VitalsProbe>>,
    nav_timing: Option<NavigationTiming>,

    hidden_hooks: Arc<Mutex<Vec<Hook>>>,
    pagehide_hooks: Arc<Mutex<Vec<Hook>>>,
    error_hooks: Arc<Mutex<Vec<ErrorHook>>>,
    panic_hook_installed: AtomicBool,
}

impl HostPlatform {
    pub fn builder() -> HostPlatformBuilder {
        HostPlatformBuilder::new()
    }

    /// Flip visibility to `Hidden` and fire the hidden/page-hide hooks,
    /// exactly as the signal watcher does. Call this before a graceful
    /// exit so the collector gets its final reliable flush.
    pub fn begin_teardown(&self) {
        self.hidden.store(true, Ordering::SeqCst);
        for hook in self.hidden_hooks.lock().iter() {
            hook();
        }
        for hook in self.pagehide_hooks.lock().iter() {
            hook();
        }
    }

    /// Manually override visibility (embedding contexts that have their
    /// own notion of foreground/background).
    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
    }
}

impl Platform for HostPlatform {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn page_url(&self) -> String {
        self.page_url.clone()
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn visibility(&self) -> Visibility {
        if self.hidden.load(Ordering::SeqCst) {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    fn schedule_idle(&self, _max_delay: Duration, task: Task) {
        // Tokio has no idle-priority queue; yielding once lets already
        // scheduled work run first, which is close enough for setup
        // deferral. Without a runtime, fall back to a short-lived thread
        // so the call itself stays non-blocking.
        match &self.runtime {
            Some(rt) => {
                rt.spawn(async move {
                    tokio::task::yield_now().await;
                    task();
                });
            }
            None => {
                std::thread::spawn(task);
            }
        }
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        match &self.runtime {
            Some(rt) => {
                rt.spawn(async move {
                    tokio::time::sleep(delay).await;
                    task();
                });
            }
            None => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    task();
                });
            }
        }
    }

    fn start_interval(&self, period: Duration, tick: Hook) -> TimerHandle {
        let Some(rt) = &self.runtime else {
            return TimerHandle::noop();
        };
        let handle = rt.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so ticks
            // arrive one full period apart.
            interval.tick().await;
            loop {
                interval.tick().await;
                tick();
            }
        });
        TimerHandle::new(move || handle.abort())
    }

    fn on_uncaught_error(&self, hook: ErrorHook) {
        self.error_hooks.lock().push(hook);

        if !self.panic_hook_installed.swap(true, Ordering::SeqCst) {
            let hooks = Arc::clone(&self.error_hooks);
            let previous = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                let message = info
                    .payload()
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| info.payload().downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panic with non-string payload".to_string());
                let stack = info
                    .location()
                    .map(|loc| format!("at {}:{}:{}", loc.file(), loc.line(), loc.column()));
                for hook in hooks.lock().iter() {
                    hook(message.clone(), stack.clone());
                }
                previous(info);
            }));
        }
    }

    fn on_visibility_hidden(&self, hook: Hook) {
        self.hidden_hooks.lock().push(hook);
    }

    fn on_page_hide(&self, hook: Hook) {
        self.pagehide_hooks.lock().push(hook);
    }

    fn on_load(&self, hook: Hook) {
        // Load already happened from the process's point of view; run
        // the hook asynchronously so registration stays non-blocking.
        self.schedule_idle(Duration::from_millis(0), Box::new(move || hook()));
    }

    fn post_json(&self, url: &str, body: Vec<u8>) {
        let (Some(rt), Some(client)) = (&self.runtime, &self.client) else {
            return;
        };
        let request = client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        rt.spawn(async move {
            let _ = request.send().await;
        });
    }

    fn supports_reliable_send(&self) -> bool {
        self.reliable
    }

    fn reliable_send(&self, url: &str, body: Vec<u8>) {
        if !self.reliable {
            return;
        }
        let url = url.to_string();
        let user_agent = self.user_agent.clone();
        std::thread::spawn(move || {
            let Ok(client) = reqwest::blocking::Client::builder()
                .user_agent(user_agent)
                .timeout(BEACON_TIMEOUT)
                .build()
            else {
                return;
            };
            let _ = client
                .post(&url)
                .header("content-type", "application/json")
                .body(body)
                .send();
        });
    }

    fn vitals_probe(&self) -> Option<Arc<dyn VitalsProbe>> {
        self.vitals.clone()
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.nav_timing
    }
}

// ─── Builder ─────────────────────────────────────────────────────

pub struct HostPlatformBuilder {
    page_url: String,
    user_agent: String,
    reliable: bool,
    watch_signals: bool,
    vitals: Option<Arc<dyn VitalsProbe>>,
    nav_timing: Option<NavigationTiming>,
}

impl HostPlatformBuilder {
    pub fn new() -> Self {
        Self {
            page_url: "app://local/".into(),
            user_agent: format!(
                "telemetry-beacon/{} ({})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            ),
            reliable: true,
            watch_signals: true,
            vitals: None,
            nav_timing: None,
        }
    }

    /// Identity reported in every record's `url` field.
    pub fn page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = url.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Disable the detached-thread reliable path; hidden-state flushes
    /// then fall back to the standard per-queue submission.
    pub fn without_reliable_send(mut self) -> Self {
        self.reliable = false;
        self
    }

    /// Don't listen for Ctrl-C; teardown must then be driven manually
    /// via [`HostPlatform::begin_teardown`].
    pub fn without_signal_watcher(mut self) -> Self {
        self.watch_signals = false;
        self
    }

    pub fn vitals_probe(mut self, probe: Arc<dyn VitalsProbe>) -> Self {
        self.vitals = Some(probe);
        self
    }

    pub fn navigation_timing(mut self, timing: NavigationTiming) -> Self {
        self.nav_timing = Some(timing);
        self
    }

    pub fn build(self) -> Arc<HostPlatform> {
        let runtime = Handle::try_current().ok();
        let client = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(POST_TIMEOUT)
            .build()
            .ok();

        let platform = Arc::new(HostPlatform {
            page_url: self.page_url,
            user_agent: self.user_agent,
            hidden: Arc::new(AtomicBool::new(false)),
            runtime,
            client,
            reliable: self.reliable,
            vitals: self.vitals,
            nav_timing: self.nav_timing,
            hidden_hooks: Arc::new(Mutex::new(Vec::new())),
            pagehide_hooks: Arc::new(Mutex::new(Vec::new())),
            error_hooks: Arc::new(Mutex::new(Vec::new())),
            panic_hook_installed: AtomicBool::new(false),
        });

        if self.watch_signals {
            if let Some(rt) = &platform.runtime {
                let hidden = Arc::clone(&platform.hidden);
                let hidden_hooks = Arc::clone(&platform.hidden_hooks);
                let pagehide_hooks = Arc::clone(&platform.pagehide_hooks);
                rt.spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        hidden.store(true, Ordering::SeqCst);
                        for hook in hidden_hooks.lock().iter() {
                            hook();
                        }
                        for hook in pagehide_hooks.lock().iter() {
                            hook();
                        }
                    }
                });
            }
        }

        platform
    }
}

impl Default for HostPlatformBuilder {
    fn default() -> Self {
        Self::new()
    }
}
