//! HTTP service for the BEEN host manager.
//!
//! Exposes the node lifecycle controller from `been-core` over a small
//! JSON API, an SSE event stream, and HTTP adapters for the task manager
//! and load monitor.

pub mod api;
pub mod handlers;
pub mod infra;
pub mod routes;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

pub use infra::app_state::AppState;

/// Full application router with tracing, ready to serve.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .merge(routes::create_api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
