//! Deferred acquisition of load-quality metrics.
//!
//! Runs well after the host's load signal so measurement never
//! competes with real work: ~2 s later the navigation-timing breakdown
//! and the immediately-available vitals (CLS, LCP) are recorded; the
//! rest (FID, FCP, TTFB) follow after a further ~3 s. A host without
//! the probe or the timing data simply produces fewer metrics.

use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::platform::{Platform, VitalKind, VitalsProbe};

use super::collector::Monitor;

/// Delay between the load signal and the first observation round.
const WARMUP_DELAY: Duration = Duration::from_secs(2);

/// Additional delay before the less critical vitals are observed.
const DEFERRED_DELAY: Duration = Duration::from_secs(3);

pub(crate) fn setup_performance_tracking(platform: Arc<dyn Platform>, monitor: Weak<Monitor>) {
    let hook_platform = Arc::clone(&platform);
    platform.on_load(Box::new(move || {
        let platform = Arc::clone(&hook_platform);
        let monitor = monitor.clone();
        let task_platform = Arc::clone(&platform);
        platform.schedule_after(
            WARMUP_DELAY,
            Box::new(move || observe_initial(&task_platform, &monitor)),
        );
    }));
}

fn observe_initial(platform: &Arc<dyn Platform>, monitor: &Weak<Monitor>) {
    if let Some(m) = monitor.upgrade() {
        if let Some(timing) = platform.navigation_timing() {
            m.track_metric("TTFB", timing.ttfb_ms);
            m.track_metric("DomContentLoaded", timing.dom_content_loaded_ms);
            m.track_metric("LoadComplete", timing.load_complete_ms);
        }
    }

    let Some(probe) = platform.vitals_probe() else {
        return;
    };

    for kind in [VitalKind::Cls, VitalKind::Lcp] {
        subscribe(&probe, kind, monitor.clone());
    }

    let deferred_probe = Arc::clone(&probe);
    let deferred_monitor = monitor.clone();
    platform.schedule_after(
        DEFERRED_DELAY,
        Box::new(move || {
            for kind in [VitalKind::Fid, VitalKind::Fcp, VitalKind::Ttfb] {
                subscribe(&deferred_probe, kind, deferred_monitor.clone());
            }
        }),
    );
}

fn subscribe(probe: &Arc<dyn VitalsProbe>, kind: VitalKind, monitor: Weak<Monitor>) {
    probe.observe(
        kind,
        Box::new(move |value| {
            if let Some(m) = monitor.upgrade() {
                m.track_metric(kind.name(), value);
            }
        }),
    );
}
