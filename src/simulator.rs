//! Synthetic traffic generator for the demo binary and sink testing.
//!
//! Spawns a handful of workers that behave like busy visitors: page
//! views over a fixed path pool, plausible load-time metrics, and the
//! occasional tracked error. Everything goes through the public
//! tracking API, so the whole pipeline (queues → batches → HTTP →
//! sink) is exercised exactly as a real host application would.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::monitor::Monitor;

// ─── Configuration ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of concurrent visitor tasks.
    pub workers: u32,
    /// How long the simulation runs.
    pub duration: Duration,
    /// Percentage of page views that also report an error (0–100).
    pub error_pct: u8,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            duration: Duration::from_secs(10),
            error_pct: 5,
        }
    }
}

/// Path pool the synthetic visitors browse.
static PAGES: &[&str] = &[
    "/",
    "/services",
    "/pricing",
    "/about",
    "/contact",
    "/imprint",
];

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `config.workers` tasks that drive the monitor until the
/// deadline, then waits for all of them.
pub async fn run(monitor: Arc<Monitor>, config: SimulatorConfig) {
    let deadline = Instant::now() + config.duration;

    let mut handles = Vec::with_capacity(config.workers as usize);
    for worker_id in 0..config.workers {
        let monitor = Arc::clone(&monitor);
        let error_pct = config.error_pct;
        handles.push(tokio::spawn(async move {
            worker(worker_id, monitor, deadline, error_pct).await;
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: u32, monitor: Arc<Monitor>, deadline: Instant, error_pct: u8) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);

    while Instant::now() < deadline {
        let page = PAGES[rng.gen_range(0..PAGES.len())];
        monitor.track_interaction("pageView", page);
        monitor.track_metric("LoadComplete", rng.gen_range(120.0..2_400.0));

        if rng.gen_range(0..100) < error_pct as u32 {
            monitor.track_error_message(format!("synthetic failure on {page}"));
        }

        tokio::time::sleep(Duration::from_millis(rng.gen_range(20..120))).await;
    }
}
