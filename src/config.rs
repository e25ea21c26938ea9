use std::time::Duration;

// ─── Defaults ────────────────────────────────────────────────────

/// Root path of the remote collection service.
pub const DEFAULT_ENDPOINT: &str = "/api/monitoring";

/// Error-queue length that triggers an immediate flush of that queue.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Period of the automatic flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Environment variable selecting the run mode.
pub const RUN_MODE_VAR: &str = "BEACON_MODE";

// ─── Run mode ────────────────────────────────────────────────────

/// Whether outbound submissions really leave the process.
///
/// In `Development` every delivery is replaced by a debug-log line and
/// no network call is made; `Production` performs real submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Production,
    Development,
}

impl RunMode {
    /// Read the run mode from `BEACON_MODE`. Anything other than
    /// `"production"` (case-insensitive) is treated as development.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(RUN_MODE_VAR).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

// ─── Collector configuration ─────────────────────────────────────

/// Full configuration of a [`Monitor`](crate::Monitor) instance.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Root URL of the collection service; batch routes are appended
    /// (`/errors`, `/metrics`, `/interactions`, `/all`).
    pub endpoint: String,

    /// Error-queue length that triggers an immediate error flush.
    pub batch_size: usize,

    /// Period of the automatic flush timer.
    pub flush_interval: Duration,

    /// Log every tracked event and delivery attempt.
    pub debug: bool,

    /// Real delivery vs. log-only.
    pub run_mode: RunMode,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            debug: false,
            run_mode: RunMode::Production,
        }
    }
}

impl MonitorConfig {
    /// Defaults with the run mode taken from the environment.
    /// Development mode enables debug logging unless overridden later.
    pub fn from_env() -> Self {
        let run_mode = RunMode::from_env();
        Self {
            debug: run_mode == RunMode::Development,
            run_mode,
            ..Self::default()
        }
    }
}

// ─── Init-time options ───────────────────────────────────────────

/// Caller-facing options for [`init_monitoring`](crate::init_monitoring).
/// Unset fields keep the environment-derived defaults.
#[derive(Debug, Clone, Default)]
pub struct MonitorOptions {
    pub debug: Option<bool>,
    pub endpoint: Option<String>,
}

impl MonitorOptions {
    /// Overlay these options onto a base configuration.
    pub fn apply(self, mut config: MonitorConfig) -> MonitorConfig {
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_parsing() {
        assert_eq!(RunMode::parse(Some("production")), RunMode::Production);
        assert_eq!(RunMode::parse(Some("PRODUCTION")), RunMode::Production);
        assert_eq!(RunMode::parse(Some("development")), RunMode::Development);
        assert_eq!(RunMode::parse(Some("staging")), RunMode::Development);
        assert_eq!(RunMode::parse(None), RunMode::Development);
    }

    #[test]
    fn options_overlay_keeps_unset_fields() {
        let base = MonitorConfig::default();
        let config = MonitorOptions {
            debug: Some(true),
            endpoint: None,
        }
        .apply(base.clone());

        assert!(config.debug);
        assert_eq!(config.endpoint, base.endpoint);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);

        let config = MonitorOptions {
            debug: None,
            endpoint: Some("https://collect.example/v1".into()),
        }
        .apply(base);
        assert!(!config.debug);
        assert_eq!(config.endpoint, "https://collect.example/v1");
    }
}
