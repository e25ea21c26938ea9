use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Instant;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use crate::monitor::{CombinedPayload, ErrorReport, PerformanceMetric, UserInteraction};

use super::percentiles::PercentileSet;

// ─── Configuration ───────────────────────────────────────────────

/// How many individual error reports we keep for the live feed.
const MAX_RECENT_ERRORS: usize = 100;

/// Histogram range: 1 µs → 10 min, 3 significant figures. Metric
/// values arrive as milliseconds and are recorded in microseconds.
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 600_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe aggregation of everything the sink has received.
/// Ingest handlers call `record_*`, the summary/SSE routes call
/// `snapshot()`.
pub struct SinkStore {
    inner: Mutex<Inner>,
}

/// Complete snapshot shipped to the summary route and on every SSE tick.
#[derive(Debug, Clone, Serialize)]
pub struct SinkSnapshot {
    // Counters
    pub errors_total: u64,
    pub metrics_total: u64,
    pub interactions_total: u64,
    pub batches: u64,
    pub beacon_batches: u64,
    pub events_per_sec: f64,
    pub elapsed_secs: f64,

    // Breakdowns
    pub metrics: BTreeMap<String, PercentileSet>,
    pub interactions_by_type: BTreeMap<String, u64>,
    pub recent_errors: Vec<ErrorReport>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    errors_total: u64,
    metrics_total: u64,
    interactions_total: u64,
    batches: u64,
    beacon_batches: u64,

    metric_hists: HashMap<String, Histogram<u64>>,
    interactions_by_type: BTreeMap<String, u64>,
    recent_errors: VecDeque<ErrorReport>,

    // Wall-clock anchor for elapsed time / rate
    start_time: Option<Instant>,
}

// ─── SinkStore impl ──────────────────────────────────────────────

impl SinkStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    /// One standard-flush error batch.
    pub fn record_errors(&self, batch: Vec<ErrorReport>) {
        let mut inner = self.inner.lock();
        inner.batches += 1;
        inner.ingest_errors(batch);
    }

    /// One standard-flush metric batch.
    pub fn record_metrics(&self, batch: Vec<PerformanceMetric>) {
        let mut inner = self.inner.lock();
        inner.batches += 1;
        inner.ingest_metrics(batch);
    }

    /// One standard-flush interaction batch.
    pub fn record_interactions(&self, batch: Vec<UserInteraction>) {
        let mut inner = self.inner.lock();
        inner.batches += 1;
        inner.ingest_interactions(batch);
    }

    /// One teardown-time combined payload.
    pub fn record_combined(&self, payload: CombinedPayload) {
        let mut inner = self.inner.lock();
        inner.beacon_batches += 1;
        inner.ingest_errors(payload.errors);
        inner.ingest_metrics(payload.metrics);
        inner.ingest_interactions(payload.interactions);
    }

    /// Produce a read-only snapshot for the summary route / SSE stream.
    pub fn snapshot(&self) -> SinkSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Default for SinkStore {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new() -> Self {
        Self {
            errors_total: 0,
            metrics_total: 0,
            interactions_total: 0,
            batches: 0,
            beacon_batches: 0,
            metric_hists: HashMap::new(),
            interactions_by_type: BTreeMap::new(),
            recent_errors: VecDeque::with_capacity(MAX_RECENT_ERRORS + 1),
            start_time: None,
        }
    }

    fn touch(&mut self) {
        self.start_time.get_or_insert_with(Instant::now);
    }

    fn ingest_errors(&mut self, batch: Vec<ErrorReport>) {
        self.touch();
        self.errors_total += batch.len() as u64;
        for report in batch {
            self.recent_errors.push_back(report);
            if self.recent_errors.len() > MAX_RECENT_ERRORS {
                self.recent_errors.pop_front();
            }
        }
    }

    fn ingest_metrics(&mut self, batch: Vec<PerformanceMetric>) {
        self.touch();
        self.metrics_total += batch.len() as u64;
        for metric in batch {
            let hist = self.metric_hists.entry(metric.name).or_insert_with(|| {
                Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
                    .expect("histogram creation")
            });
            // ms → µs, clamped into the histogram's range
            let us = (metric.value * 1_000.0).clamp(1.0, HIST_HIGH as f64) as u64;
            let _ = hist.record(us);
        }
    }

    fn ingest_interactions(&mut self, batch: Vec<UserInteraction>) {
        self.touch();
        self.interactions_total += batch.len() as u64;
        for interaction in batch {
            *self.interactions_by_type.entry(interaction.kind).or_insert(0) += 1;
        }
    }

    fn snapshot(&self) -> SinkSnapshot {
        let elapsed_secs = self
            .start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        let events_total = self.errors_total + self.metrics_total + self.interactions_total;
        let events_per_sec = if elapsed_secs > 0.0 {
            events_total as f64 / elapsed_secs
        } else {
            0.0
        };

        SinkSnapshot {
            errors_total: self.errors_total,
            metrics_total: self.metrics_total,
            interactions_total: self.interactions_total,
            batches: self.batches,
            beacon_batches: self.beacon_batches,
            events_per_sec,
            elapsed_secs,
            metrics: self
                .metric_hists
                .iter()
                .map(|(name, hist)| (name.clone(), PercentileSet::from_histogram(hist)))
                .collect(),
            interactions_by_type: self.interactions_by_type.clone(),
            recent_errors: self.recent_errors.iter().cloned().collect(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────
