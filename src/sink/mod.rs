//! Development-time collection service.
//!
//! A small axum backend that accepts the collector's outbound batches
//! (`/errors`, `/metrics`, `/interactions`, `/all`), aggregates them in
//! memory, and exposes a JSON summary plus an SSE stream for watching
//! traffic live. Useful for local development and integration tests;
//! production deployments point the collector at their real backend.

pub mod percentiles;
pub mod server;
pub mod store;

pub use percentiles::PercentileSet;
pub use server::{router, serve, SinkError};
pub use store::{SinkSnapshot, SinkStore};
