//! HTTP adapter: health check and the trade decision endpoint.

mod error;
mod handlers;

pub use error::{WebError, status_for};
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::pipeline::DecisionPipeline;

pub struct AppState {
    pub pipeline: Arc<DecisionPipeline>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/trade", post(handlers::trade))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
