//! Full-pipeline tests: a real `Monitor` on a `HostPlatform` delivering
//! over HTTP to the in-process sink.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use telemetry_beacon::sink::{self, SinkStore};
use telemetry_beacon::{HostPlatform, Monitor, MonitorConfig, RunMode};

const PAGE_URL: &str = "https://e2e.test/landing";

async fn start_sink(store: Arc<SinkStore>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = sink::router(store);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn initialized_monitor(addr: SocketAddr) -> (Arc<Monitor>, Arc<HostPlatform>) {
    let platform = HostPlatform::builder()
        .page_url(PAGE_URL)
        .without_signal_watcher()
        .build();
    let config = MonitorConfig {
        endpoint: format!("http://{addr}/api/monitoring"),
        flush_interval: Duration::from_secs(60),
        run_mode: RunMode::Production,
        ..MonitorConfig::default()
    };
    let monitor = Monitor::new(config, platform.clone());
    monitor.initialize();
    while !monitor.is_initialized() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    (monitor, platform)
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_batch_reaches_the_sink_as_one_post() {
    let store = Arc::new(SinkStore::new());
    let addr = start_sink(Arc::clone(&store)).await;
    let (monitor, _platform) = initialized_monitor(addr).await;

    for _ in 0..20 {
        monitor.track_error_message("e2e failure");
    }

    let probe = Arc::clone(&store);
    wait_for(move || probe.snapshot().errors_total == 20).await;

    let snap = store.snapshot();
    assert_eq!(snap.batches, 1, "threshold flush must be a single batch");
    assert_eq!(snap.beacon_batches, 0);
    assert_eq!(snap.recent_errors.len(), 20);
    for report in &snap.recent_errors {
        assert_eq!(report.message, "e2e failure");
        assert_eq!(report.url, PAGE_URL);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.timestamp).is_ok());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn teardown_delivers_everything_through_the_reliable_path() {
    let store = Arc::new(SinkStore::new());
    let addr = start_sink(Arc::clone(&store)).await;
    let (monitor, platform) = initialized_monitor(addr).await;

    monitor.track_error_message("going down");
    monitor.track_metric("LCP", 1430.0);
    monitor.track_metric("LCP", 1710.0);
    monitor.track_interaction("pageView", "/checkout");

    platform.begin_teardown();

    let probe = Arc::clone(&store);
    wait_for(move || probe.snapshot().beacon_batches == 1).await;

    let snap = store.snapshot();
    assert_eq!(snap.batches, 0, "nothing should use the standard path");
    assert_eq!(snap.errors_total, 1);
    assert_eq!(snap.metrics_total, 2);
    assert_eq!(snap.interactions_total, 1);
    assert_eq!(snap.interactions_by_type["pageView"], 1);
    assert_eq!(snap.metrics["LCP"].count, 2);
}
