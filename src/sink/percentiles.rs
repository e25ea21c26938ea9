use hdrhistogram::Histogram;
use serde::Serialize;

/// Percentile breakdown of one metric name, in milliseconds.
/// Serialized straight into the summary JSON and the SSE stream.
#[derive(Debug, Clone, Serialize)]
pub struct PercentileSet {
    pub count: u64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl PercentileSet {
    /// Extract a full percentile set from a histogram of microsecond
    /// values. Returns zeroed values if the histogram is empty.
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }
        Self {
            count: hist.len(),
            min_ms: hist.min() as f64 / 1_000.0,
            mean_ms: hist.mean() / 1_000.0,
            p50_ms: hist.value_at_percentile(50.0) as f64 / 1_000.0,
            p95_ms: hist.value_at_percentile(95.0) as f64 / 1_000.0,
            p99_ms: hist.value_at_percentile(99.0) as f64 / 1_000.0,
            max_ms: hist.max() as f64 / 1_000.0,
        }
    }

    /// All-zero placeholder used before any values are recorded.
    pub fn empty() -> Self {
        Self {
            count: 0,
            min_ms: 0.0,
            mean_ms: 0.0,
            p50_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            max_ms: 0.0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_yields_zeroes() {
        let hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
        let set = PercentileSet::from_histogram(&hist);
        assert!(!set.has_data());
        assert_eq!(set.count, 0);
        assert_eq!(set.p99_ms, 0.0);
    }

    #[test]
    fn millisecond_conversion_is_sane() {
        let mut hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
        for _ in 0..100 {
            hist.record(1_000).unwrap(); // 1 ms in µs
        }
        let set = PercentileSet::from_histogram(&hist);
        assert_eq!(set.count, 100);
        assert!((0.9..=1.1).contains(&set.p50_ms), "p50 = {}", set.p50_ms);
        assert!((0.9..=1.1).contains(&set.mean_ms));
    }
}
