use std::sync::Arc;
use std::time::Duration;

use telemetry_beacon::simulator::{self, SimulatorConfig};
use telemetry_beacon::sink::{self, SinkStore};
use telemetry_beacon::{
    HostPlatform, Monitor, MonitorConfig, NavigationTiming, RunMode,
};

#[tokio::main]
async fn main() {
    env_logger::init();

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   📡  TELEMETRY BEACON — LIVE DEMO               ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Start the collection sink ─────────────────────────────
    let store = Arc::new(SinkStore::new());
    let addr = "127.0.0.1:4100";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind sink port 4100 — is it already in use?");
    let app = sink::router(Arc::clone(&store));
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Sink exited with error");
    });

    println!("Sink listening on http://{addr}");
    println!("Summary  → http://{addr}/api/monitoring/summary");
    println!("Live SSE → http://{addr}/api/monitoring/stream");
    println!();

    // ── 2. Monitor pointed at the sink ───────────────────────────
    // Production run mode so batches really travel over HTTP.
    let platform = HostPlatform::builder()
        .page_url("https://demo.example/")
        .navigation_timing(NavigationTiming {
            ttfb_ms: 42.0,
            dom_content_loaded_ms: 280.0,
            load_complete_ms: 740.0,
        })
        .build();
    let config = MonitorConfig {
        endpoint: format!("http://{addr}/api/monitoring"),
        flush_interval: Duration::from_secs(5),
        run_mode: RunMode::Production,
        ..MonitorConfig::default()
    };
    let monitor = Monitor::new(config, platform.clone());
    telemetry_beacon::install(Arc::clone(&monitor));
    monitor.initialize();
    while !monitor.is_initialized() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    telemetry_beacon::track_page_view("/");

    // ── 3. Synthetic visitors ────────────────────────────────────
    let sim = SimulatorConfig {
        workers: 4,
        duration: Duration::from_secs(15),
        error_pct: 8,
    };
    println!(
        "🚦 Simulating {} visitors for {}s (Ctrl-C flushes and exits)...",
        sim.workers,
        sim.duration.as_secs()
    );
    simulator::run(Arc::clone(&monitor), sim).await;

    // ── 4. Teardown: final flush through the reliable path ───────
    platform.begin_teardown();
    tokio::time::sleep(Duration::from_millis(750)).await;

    // ── 5. What the sink saw ─────────────────────────────────────
    let snap = store.snapshot();
    println!();
    println!("📊 Sink totals after {:.1}s:", snap.elapsed_secs);
    println!("   errors        {}", snap.errors_total);
    println!("   metrics       {}", snap.metrics_total);
    println!("   interactions  {}", snap.interactions_total);
    println!(
        "   batches       {} standard, {} beacon",
        snap.batches, snap.beacon_batches
    );
    if let Some(load) = snap.metrics.get("LoadComplete") {
        println!(
            "   LoadComplete  p50 {:.0} ms / p95 {:.0} ms / max {:.0} ms",
            load.p50_ms, load.p95_ms, load.max_ms
        );
    }
}
