use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;

use crate::monitor::{CombinedPayload, ErrorReport, PerformanceMetric, UserInteraction};

use super::store::{SinkSnapshot, SinkStore};

/// How often the SSE stream pushes a fresh snapshot.
const STREAM_PERIOD: Duration = Duration::from_secs(2);

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sink server error: {0}")]
    Serve(#[from] std::io::Error),
}

// ─── Router ──────────────────────────────────────────────────────

/// Builds the full sink `Router`: the four ingest routes the collector
/// submits to, plus a summary snapshot and a live SSE stream.
pub fn router(store: Arc<SinkStore>) -> Router {
    Router::new()
        // ── Ingest (collector-facing) ───────────────────────────
        .route("/api/monitoring/errors", post(ingest_errors))
        .route("/api/monitoring/metrics", post(ingest_metrics))
        .route("/api/monitoring/interactions", post(ingest_interactions))
        .route("/api/monitoring/all", post(ingest_all))
        // ── Inspection ──────────────────────────────────────────
        .route("/api/monitoring/summary", get(summary))
        .route("/api/monitoring/stream", get(stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(store)
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the process exits.
pub async fn serve(addr: &str, store: Arc<SinkStore>) -> Result<(), SinkError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| SinkError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    axum::serve(listener, router(store)).await?;
    Ok(())
}

// ─── Ingest handlers ─────────────────────────────────────────────

async fn ingest_errors(
    State(store): State<Arc<SinkStore>>,
    Json(batch): Json<Vec<ErrorReport>>,
) -> StatusCode {
    store.record_errors(batch);
    StatusCode::ACCEPTED
}

async fn ingest_metrics(
    State(store): State<Arc<SinkStore>>,
    Json(batch): Json<Vec<PerformanceMetric>>,
) -> StatusCode {
    store.record_metrics(batch);
    StatusCode::ACCEPTED
}

async fn ingest_interactions(
    State(store): State<Arc<SinkStore>>,
    Json(batch): Json<Vec<UserInteraction>>,
) -> StatusCode {
    store.record_interactions(batch);
    StatusCode::ACCEPTED
}

/// Teardown-time payload: the union of all three queues in one body.
async fn ingest_all(
    State(store): State<Arc<SinkStore>>,
    Json(payload): Json<CombinedPayload>,
) -> StatusCode {
    store.record_combined(payload);
    StatusCode::ACCEPTED
}

// ─── Inspection handlers ─────────────────────────────────────────

/// GET /api/monitoring/summary — a single JSON snapshot.
async fn summary(State(store): State<Arc<SinkStore>>) -> Json<SinkSnapshot> {
    Json(store.snapshot())
}

/// GET /api/monitoring/stream — Server-Sent Events.
/// Pushes a full `SinkSnapshot` as JSON every couple of seconds.
async fn stream(
    State(store): State<Arc<SinkStore>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(STREAM_PERIOD);

    let stream = IntervalStream::new(interval).map(move |_| {
        let snapshot = store.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
